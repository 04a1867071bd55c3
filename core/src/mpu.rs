//! The Matrix/Vector Processing Unit: the compute executor a `Call` hands
//! control to.
//!
//! Unlike the CU, the MPU's loop inspects each instruction's `Tag` before
//! dispatching: compute ops run synchronously and gate a path; load/store
//! ops hand off to the LSU and keep going; `Fence`/basic ops just run their
//! kernel directly, since `crate::kernels::control::fence` already
//! implements the wait-then-advance contract a `Fence` needs.

use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle};

use log::trace;

use crate::accelerator::Accelerator;
use crate::inst::Tag;
use crate::unit::{Lifecycle, MpuCtx, UnitState};

pub struct Mpu {
    lifecycle: Arc<Lifecycle>,
    pc: Mutex<usize>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Mpu {
    pub fn spawn(accel: Weak<Accelerator>) -> Arc<Self> {
        let mpu = Arc::new(Mpu {
            lifecycle: Arc::new(Lifecycle::new("MPU")),
            pc: Mutex::new(0),
            thread: Mutex::new(None),
        });
        let worker = Arc::clone(&mpu);
        let handle = thread::spawn(move || Mpu::worker_loop(worker, accel));
        *mpu.thread.lock().unwrap() = Some(handle);
        mpu
    }

    pub fn run(&self, entry: usize) {
        *self.pc.lock().unwrap() = entry;
        self.lifecycle.set(UnitState::Running);
    }

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

    fn worker_loop(mpu: Arc<Mpu>, accel: Weak<Accelerator>) {
        loop {
            mpu.lifecycle.wait_while_idling();
            if mpu.lifecycle.is_shutdown() {
                return;
            }
            let accel = match accel.upgrade() {
                Some(a) => a,
                None => return,
            };
            let mut pc = *mpu.pc.lock().unwrap();
            loop {
                if mpu.lifecycle.is_shutdown() {
                    return;
                }
                let guard = accel.program();
                if pc >= guard.len() {
                    break;
                }
                let tag = guard.get(pc).tag;
                match tag {
                    Tag::Ret => break,
                    Tag::Load | Tag::Store => {
                        let path = guard.get(pc).path;
                        drop(guard);
                        if let Some(p) = accel.paths().get(path) {
                            p.insert();
                        }
                        trace!("MPU pc={pc} enqueue {:?}", tag);
                        match tag {
                            Tag::Load => accel.lsu().enqueue_read(pc),
                            Tag::Store => accel.lsu().enqueue_write(pc),
                            _ => unreachable!(),
                        }
                        pc += 1;
                    }
                    Tag::MatCompute | Tag::VecCompute => {
                        let path = guard.get(pc).path;
                        if let Some(p) = accel.paths().get(path) {
                            p.insert();
                        }
                        let inst = guard.get(pc);
                        trace!("MPU pc={pc} {}", inst.name);
                        let mut ctx = MpuCtx::new(&mut pc);
                        (inst.kernel)(&accel, &mut ctx, inst);
                        drop(guard);
                        if let Some(p) = accel.paths().get(path) {
                            p.erase();
                        }
                    }
                    _ => {
                        let inst = guard.get(pc);
                        let mut ctx = MpuCtx::new(&mut pc);
                        (inst.kernel)(&accel, &mut ctx, inst);
                    }
                }
            }
            *mpu.pc.lock().unwrap() = pc;
            mpu.lifecycle.set(UnitState::Idling);
        }
    }
}
