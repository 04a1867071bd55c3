//! The per-thread command queue: a thread-local-style queue singleton with
//! one in-progress `MAIN` body accumulated by [`CommandQueue::push_kernel`],
//! flushed by [`CommandQueue::synchronize`].

use std::sync::Arc;

use log::debug;
use tvacc_core::accelerator::Accelerator;
use tvacc_core::error::ProgramError;
use tvacc_core::inst::{Instruction, Program, Tag};

use crate::assembler;
use crate::error::HostError;
use crate::irq::mpu_functions;

pub struct CommandQueue {
    accel: Arc<Accelerator>,
    pending: Vec<Instruction>,
}

impl CommandQueue {
    pub fn new(accel: Arc<Accelerator>) -> Self {
        CommandQueue {
            accel,
            pending: Vec::new(),
        }
    }

    pub fn accelerator(&self) -> &Arc<Accelerator> {
        &self.accel
    }

    /// Parse one mnemonic line (the grammar in [`crate::assembler`]) and
    /// append it to the in-progress `MAIN` body.
    pub fn push_kernel(&mut self, line: &str) -> Result<(), ProgramError> {
        let inst = assembler::parse(line)?;
        debug!("push_kernel: {line}");
        self.pending.push(inst);
        Ok(())
    }

    /// Close `MAIN` with a trailing `Ret` if the caller didn't push one,
    /// build the program (predeclaring the fixed IRQ-bound MPU functions
    /// alongside it), run it to completion, and clear the pending body.
    pub fn synchronize(&mut self) -> Result<(), HostError> {
        let mut program = Program::new();
        for (name, body) in mpu_functions() {
            program.create_func(name, body);
        }

        let mut main_body = std::mem::take(&mut self.pending);
        if !main_body.iter().any(|i| i.tag == Tag::Ret) {
            main_body.push(Program::ret());
        }
        program.create_func("MAIN", main_body);
        program.build();

        self.accel.run(program)?;
        Ok(())
    }
}
