//! The Control Unit: the program's single thread of control.
//!
//! The CU owns the main fetch/execute loop. Every kernel it dispatches is
//! responsible for moving its own program counter forward — straight-line
//! instructions `pc += 1`, branches assign a new pc, `Call`/`Ret` manipulate
//! `RET` as described in `crate::kernels::control`. The CU's own job is just
//! to keep fetching until the program counter runs off the end.

use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};

use log::trace;

use crate::accelerator::Accelerator;
use crate::unit::{CuCtx, Lifecycle, UnitState};

pub struct Cu {
    lifecycle: Arc<Lifecycle>,
    pc: Mutex<usize>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Cu {
    /// Construct the CU and start its worker thread. `accel` is a `Weak`
    /// back-reference: the accelerator that owns this CU is still under
    /// construction (see `Accelerator::new`'s use of `Arc::new_cyclic`), so
    /// the worker only upgrades it once it actually has work to do.
    pub fn spawn(accel: Weak<Accelerator>) -> Arc<Self> {
        let cu = Arc::new(Cu {
            lifecycle: Arc::new(Lifecycle::new("CU")),
            pc: Mutex::new(0),
            thread: Mutex::new(None),
        });
        let worker = Arc::clone(&cu);
        let handle = thread::spawn(move || Cu::worker_loop(worker, accel));
        *cu.thread.lock().unwrap() = Some(handle);
        cu
    }

    /// Point the CU at `entry` and wake its worker thread.
    pub fn run(&self, entry: usize) {
        *self.pc.lock().unwrap() = entry;
        self.lifecycle.set(UnitState::Running);
    }

    /// Block until the CU has returned to `Idling` (its top-level `Ret` ran).
    pub fn wait_idle(&self) {
        self.lifecycle.wait_for(UnitState::Idling);
    }

    pub fn shutdown(&self) {
        self.lifecycle.set(UnitState::Shutdown);
    }

    pub fn join(&self) {
        if let Some(handle) = self.thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    fn worker_loop(cu: Arc<Cu>, accel: Weak<Accelerator>) {
        loop {
            cu.lifecycle.wait_while_idling();
            if cu.lifecycle.is_shutdown() {
                return;
            }
            let accel = match accel.upgrade() {
                Some(a) => a,
                None => return,
            };
            let mut pc = *cu.pc.lock().unwrap();
            loop {
                if cu.lifecycle.is_shutdown() {
                    return;
                }
                let guard = accel.program();
                if pc >= guard.len() {
                    break;
                }
                let inst = guard.get(pc);
                trace!("CU pc={pc} {}", inst.name);
                let mut ctx = CuCtx::new(&mut pc);
                (inst.kernel)(&accel, &mut ctx, inst);
            }
            *cu.pc.lock().unwrap() = pc;
            cu.lifecycle.set(UnitState::Idling);
        }
    }
}
