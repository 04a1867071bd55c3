//! Shared worker-thread lifecycle and per-unit execution context.
//!
//! CU, MPU, and the two LSU queues are all "a thread that sits idle until
//! told to run, runs until its own loop condition says stop, then goes back
//! to idle" — the same four-state machine the original firmware used for
//! every unit. We factor that state machine out once here so `cu.rs`/`mpu.rs`
//! only implement the part that actually differs: what "run" means.

use std::sync::{Condvar, Mutex};

use log::debug;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnitState {
    Idling,
    Running,
    Halt,
    Shutdown,
}

/// A `Mutex<UnitState>` plus the condition variable every unit's outer
/// `wait()` blocks on. Transitions are logged at `debug` since they're the
/// coarsest-grained trace of what the accelerator is doing.
pub struct Lifecycle {
    name: &'static str,
    state: Mutex<UnitState>,
    changed: Condvar,
}

impl Lifecycle {
    pub fn new(name: &'static str) -> Self {
        Lifecycle {
            name,
            state: Mutex::new(UnitState::Idling),
            changed: Condvar::new(),
        }
    }

    pub fn set(&self, next: UnitState) {
        let mut guard = self.state.lock().unwrap();
        if *guard != next {
            debug!("{} {:?} -> {:?}", self.name, *guard, next);
        }
        *guard = next;
        self.changed.notify_all();
    }

    pub fn get(&self) -> UnitState {
        *self.state.lock().unwrap()
    }

    /// Block until the state equals `target`.
    pub fn wait_for(&self, target: UnitState) {
        let guard = self.state.lock().unwrap();
        let _guard = self.changed.wait_while(guard, |s| *s != target).unwrap();
    }

    /// Block until the state is anything other than `Idling` — used by a
    /// worker's own loop to wait for the next `run()` call.
    pub fn wait_while_idling(&self) {
        let guard = self.state.lock().unwrap();
        let _guard = self
            .changed
            .wait_while(guard, |s| *s == UnitState::Idling)
            .unwrap();
    }

    pub fn is_shutdown(&self) -> bool {
        self.get() == UnitState::Shutdown
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Role {
    Cu,
    Mpu,
    Lsu,
}

/// The view of "the unit currently fetching" a kernel closure gets. Kernels
/// never see the concrete `ControlUnit`/`Mpu` type, only this trait object,
/// so the same kernel body runs unmodified whichever unit dispatches it.
pub trait UnitContext {
    fn role(&self) -> Role;
    fn pc(&self) -> usize;
    fn set_pc(&mut self, pc: usize);

    fn advance(&mut self) {
        let pc = self.pc();
        self.set_pc(pc + 1);
    }
}

pub struct CuCtx<'a> {
    pc: &'a mut usize,
}

impl<'a> CuCtx<'a> {
    pub fn new(pc: &'a mut usize) -> Self {
        CuCtx { pc }
    }
}

impl<'a> UnitContext for CuCtx<'a> {
    fn role(&self) -> Role {
        Role::Cu
    }
    fn pc(&self) -> usize {
        *self.pc
    }
    fn set_pc(&mut self, pc: usize) {
        *self.pc = pc;
    }
}

pub struct MpuCtx<'a> {
    pc: &'a mut usize,
}

impl<'a> MpuCtx<'a> {
    pub fn new(pc: &'a mut usize) -> Self {
        MpuCtx { pc }
    }
}

impl<'a> UnitContext for MpuCtx<'a> {
    fn role(&self) -> Role {
        Role::Mpu
    }
    fn pc(&self) -> usize {
        *self.pc
    }
    fn set_pc(&mut self, pc: usize) {
        *self.pc = pc;
    }
}

/// The LSU never has its own program counter — its worker threads only ever
/// run a single queued kernel closure to completion — but kernels take a
/// `&mut dyn UnitContext` unconditionally, so it gets a context whose `pc`
/// is meaningless and whose `advance` is a no-op.
pub struct LsuCtx;

impl UnitContext for LsuCtx {
    fn role(&self) -> Role {
        Role::Lsu
    }
    fn pc(&self) -> usize {
        0
    }
    fn set_pc(&mut self, _pc: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_while_idling_unblocks_on_run() {
        let lc = Arc::new(Lifecycle::new("test"));
        let waiter = Arc::clone(&lc);
        let handle = thread::spawn(move || waiter.wait_while_idling());

        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());

        lc.set(UnitState::Running);
        handle.join().unwrap();
    }

    #[test]
    fn cu_ctx_advance_increments_pc() {
        let mut pc = 3usize;
        let mut ctx = CuCtx::new(&mut pc);
        ctx.advance();
        assert_eq!(ctx.pc(), 4);
    }
}
