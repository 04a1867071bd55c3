//! Synchronization lanes for in-flight AI instructions.
//!
//! A path is the only synchronization primitive a program can address
//! directly (`Fence(p)`); everything else — register writes, memory
//! copies — is otherwise unordered across units. We model "in-flight count"
//! rather than a literal set of instruction identities, since the same
//! instruction slot can be re-dispatched (a loop body issuing the same
//! `Load` repeatedly) and a `HashSet` keyed by pc would collapse those into
//! one entry; a plain counter behaves correctly regardless of reuse and is
//! all the empty/non-empty invariant `Fence` needs.

use std::sync::{Condvar, Mutex};

pub struct Path {
    inflight: Mutex<u64>,
    drained: Condvar,
}

impl Path {
    pub fn new() -> Self {
        Path {
            inflight: Mutex::new(0),
            drained: Condvar::new(),
        }
    }

    /// Mark one more AI instruction dispatched-but-not-complete on this path.
    pub fn insert(&self) {
        let mut n = self.inflight.lock().unwrap();
        *n += 1;
    }

    /// Mark one AI instruction complete; wakes any waiters if this drains
    /// the path to empty.
    pub fn erase(&self) {
        let mut n = self.inflight.lock().unwrap();
        *n = n.saturating_sub(1);
        if *n == 0 {
            self.drained.notify_all();
        }
    }

    /// Block the calling unit until this path has no in-flight instructions.
    pub fn wait(&self) {
        let guard = self.inflight.lock().unwrap();
        let _guard = self.drained.wait_while(guard, |n| *n != 0).unwrap();
    }

    pub fn is_empty(&self) -> bool {
        *self.inflight.lock().unwrap() == 0
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::new()
    }
}

/// The fixed-size vector of lanes sized by `Program::path_num` at `Build`
/// time and allocated fresh by the accelerator for each `run`.
pub struct Paths {
    lanes: Vec<Path>,
}

impl Paths {
    pub fn new(count: usize) -> Self {
        Paths {
            lanes: (0..count).map(|_| Path::new()).collect(),
        }
    }

    pub fn get(&self, idx: usize) -> Option<&Path> {
        self.lanes.get(idx)
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_returns_immediately_when_empty() {
        let p = Path::new();
        p.wait();
    }

    #[test]
    fn wait_blocks_until_drained() {
        let p = Arc::new(Path::new());
        p.insert();
        let waiter = Arc::clone(&p);
        let handle = thread::spawn(move || waiter.wait());

        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());

        p.erase();
        handle.join().unwrap();
    }
}
