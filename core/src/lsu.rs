//! The Load-Store Unit: two independent asynchronous memory-copy queues.
//!
//! Plays the role a DMA controller plays on a bus-oriented system (the
//! classic i8257-class part): an independently clocked engine the MPU hands
//! block transfers off to rather than blocking its own dispatch loop on
//! them. Reads and writes never order against each other; within a queue
//! they're FIFO; callers that need cross-queue or load/compute ordering must
//! fence on the instruction's path.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::{self, JoinHandle};

use log::trace;

use crate::accelerator::Accelerator;
use crate::unit::LsuCtx;

struct Queue {
    name: &'static str,
    items: Mutex<VecDeque<usize>>,
    not_empty: Condvar,
    busy: Mutex<bool>,
    shutdown: Mutex<bool>,
}

impl Queue {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Queue {
            name,
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
            busy: Mutex::new(false),
            shutdown: Mutex::new(false),
        })
    }

    fn push(&self, pc: usize) {
        let mut items = self.items.lock().unwrap();
        items.push_back(pc);
        self.not_empty.notify_all();
    }

    fn running(&self) -> bool {
        !self.items.lock().unwrap().is_empty() || *self.busy.lock().unwrap()
    }

    fn shutdown(&self) {
        *self.shutdown.lock().unwrap() = true;
        self.not_empty.notify_all();
    }

    fn worker_loop(queue: Arc<Queue>, accel: Weak<Accelerator>) {
        loop {
            let pc = {
                let mut items = queue.items.lock().unwrap();
                loop {
                    if *queue.shutdown.lock().unwrap() {
                        return;
                    }
                    if let Some(pc) = items.pop_front() {
                        break pc;
                    }
                    items = queue.not_empty.wait(items).unwrap();
                }
            };
            *queue.busy.lock().unwrap() = true;
            if let Some(accel) = accel.upgrade() {
                let path = {
                    let guard = accel.program();
                    let inst = guard.get(pc);
                    trace!("LSU[{}] pc={pc} {}", queue.name, inst.name);
                    let mut ctx = LsuCtx;
                    (inst.kernel)(&accel, &mut ctx, inst);
                    inst.path
                };
                if let Some(p) = accel.paths().get(path) {
                    p.erase();
                }
            }
            *queue.busy.lock().unwrap() = false;
        }
    }
}

pub struct Lsu {
    read: Arc<Queue>,
    write: Arc<Queue>,
    read_thread: Mutex<Option<JoinHandle<()>>>,
    write_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Lsu {
    pub fn spawn(accel: Weak<Accelerator>) -> Arc<Self> {
        let read = Queue::new("read");
        let write = Queue::new("write");
        let read_worker = Arc::clone(&read);
        let write_worker = Arc::clone(&write);
        let read_handle = {
            let accel = accel.clone();
            thread::spawn(move || Queue::worker_loop(read_worker, accel))
        };
        let write_handle = thread::spawn(move || Queue::worker_loop(write_worker, accel));
        Arc::new(Lsu {
            read,
            write,
            read_thread: Mutex::new(Some(read_handle)),
            write_thread: Mutex::new(Some(write_handle)),
        })
    }

    pub fn enqueue_read(&self, pc: usize) {
        self.read.push(pc);
    }

    pub fn enqueue_write(&self, pc: usize) {
        self.write.push(pc);
    }

    /// True if either queue has pending work or is mid-transfer. The CU's
    /// `Ret` spins on this before handing control back to the top-level
    /// caller.
    pub fn running(&self) -> bool {
        self.read.running() || self.write.running()
    }

    pub fn shutdown(&self) {
        self.read.shutdown();
        self.write.shutdown();
    }

    pub fn join(&self) {
        if let Some(handle) = self.read_thread.lock().unwrap().take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.write_thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}
