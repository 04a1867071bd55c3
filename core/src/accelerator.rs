//! The accelerator orchestrator.
//!
//! Owns the register files, the two memories, the path vector, and the
//! three unit workers for its full lifetime. A `Run` loads a program, points
//! the CU at `MAIN`, waits for it to return to `Idling`, and releases the
//! program — matching the original's "accelerator holds a shared reference
//! during Run and releases it on return" lifetime note.
//!
//! Units are spawned through `Arc::new_cyclic` so their worker threads can
//! hold a `Weak` back-reference to the accelerator that owns them, rather
//! than the original's raw non-owning pointer: nothing here can outlive the
//! `Arc`, so a `Weak::upgrade` failing is simply "the accelerator is mid-
//! `Drop`", never a dangling read.

use std::sync::{Arc, RwLock, RwLockReadGuard, Weak};

use log::error;

use crate::cu::Cu;
use crate::elem::Elem;
use crate::error::{ResourceError, RunError};
use crate::inst::Program;
use crate::lsu::Lsu;
use crate::memory::cache::Cache;
use crate::memory::dram::DramAllocator;
use crate::memory::{DRAM_BYTES, RawMemory};
use crate::mpu::Mpu;
use crate::path::Paths;
use crate::regfile::{GeneralRegs, SpecRegs};

pub struct Accelerator {
    general: GeneralRegs,
    special: SpecRegs,
    dram: RawMemory,
    dram_alloc: DramAllocator,
    cache: Cache,
    program: RwLock<Program>,
    paths: RwLock<Paths>,
    cu: Arc<Cu>,
    mpu: Arc<Mpu>,
    lsu: Arc<Lsu>,
}

impl Accelerator {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Accelerator>| Accelerator {
            general: GeneralRegs::new(),
            special: SpecRegs::new(),
            dram: RawMemory::new(DRAM_BYTES),
            dram_alloc: DramAllocator::new(),
            cache: Cache::new(),
            program: RwLock::new(Program::new()),
            paths: RwLock::new(Paths::new(0)),
            cu: Cu::spawn(weak.clone()),
            mpu: Mpu::spawn(weak.clone()),
            lsu: Lsu::spawn(weak.clone()),
        })
    }

    pub fn general(&self) -> &GeneralRegs {
        &self.general
    }

    pub fn special(&self) -> &SpecRegs {
        &self.special
    }

    pub fn mpu(&self) -> &Mpu {
        &self.mpu
    }

    pub fn lsu(&self) -> &Lsu {
        &self.lsu
    }

    /// The program currently loaded for the run in progress, or an empty,
    /// invalid program between runs.
    pub fn program(&self) -> RwLockReadGuard<'_, Program> {
        self.program.read().unwrap()
    }

    pub fn paths(&self) -> RwLockReadGuard<'_, Paths> {
        self.paths.read().unwrap()
    }

    pub fn dram_alloc(&self, nbytes: u32) -> Result<u32, ResourceError> {
        self.dram_alloc.alloc(nbytes)
    }

    pub fn dram_free(&self, offset: u32) -> Result<(), ResourceError> {
        self.dram_alloc.free(offset)
    }

    /// Bounds-checked read access to `len` elements of `T` at device address
    /// `addr`. Addresses below `DRAM_BYTES` index DRAM; addresses at or
    /// above it index the cache, biased by `DRAM_BYTES` (see
    /// `crate::memory`'s module docs for the address-space split).
    pub fn slice<T: Elem>(&self, addr: u64, len: usize) -> Result<&[T], ResourceError> {
        if addr < DRAM_BYTES {
            self.dram.slice::<T>(addr, len)
        } else {
            self.cache.raw().slice::<T>(addr - DRAM_BYTES, len)
        }
    }

    #[allow(clippy::mut_from_ref)]
    pub fn slice_mut<T: Elem>(&self, addr: u64, len: usize) -> Result<&mut [T], ResourceError> {
        if addr < DRAM_BYTES {
            self.dram.slice_mut::<T>(addr, len)
        } else {
            self.cache.raw().slice_mut::<T>(addr - DRAM_BYTES, len)
        }
    }

    /// Load `program`, point the CU at `MAIN`, and block until the program
    /// runs to completion. Refuses an invalid program without touching any
    /// unit, per the original's `Run` contract.
    pub fn run(self: &Arc<Self>, program: Program) -> Result<(), RunError> {
        if !program.valid() {
            error!("refusing to run an invalid program: {:?}", program.errors());
            return Err(RunError::InvalidProgram(program.errors().to_vec()));
        }
        let entry = program.get_pc("MAIN");
        let path_count = program.path_num();

        *self.paths.write().unwrap() = Paths::new(path_count);
        *self.program.write().unwrap() = program;

        self.cu.run(entry);
        self.cu.wait_idle();

        *self.program.write().unwrap() = Program::new();
        *self.paths.write().unwrap() = Paths::new(0);
        Ok(())
    }
}

impl Drop for Accelerator {
    fn drop(&mut self) {
        self.cu.shutdown();
        self.mpu.shutdown();
        self.lsu.shutdown();
        self.cu.join();
        self.mpu.join();
        self.lsu.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inst::{CallUnit, Drive};
    use crate::spec_reg::SpecReg;

    #[test]
    fn run_rejects_program_without_main() {
        let accel = Accelerator::new();
        let mut program = Program::new();
        program.create_func("OTHER", vec![Program::ret()]);
        program.build();
        let err = accel.run(program).unwrap_err();
        assert!(matches!(err, RunError::InvalidProgram(_)));
    }

    #[test]
    fn movi_then_ret_runs_to_completion() {
        let accel = Accelerator::new();
        let mut program = Program::new();
        program.create_func("MAIN", vec![Program::movi(3, 42), Program::ret()]);
        program.build();
        accel.run(program).unwrap();
        assert_eq!(accel.general().get(3).unwrap(), 42);
    }

    #[test]
    fn call_into_mpu_function_runs_a_compute_kernel() {
        let accel = Accelerator::new();
        let mut program = Program::new();
        program.create_func(
            "DOUBLE",
            vec![
                Program::vaddi(0, 0, 0, crate::elem::ElemTag::I32, 0, Drive::None, Drive::None),
                Program::ret(),
            ],
        );
        program.create_func(
            "MAIN",
            vec![
                Program::call("DOUBLE", CallUnit::Mpu, 0, 0, 0),
                Program::ret(),
            ],
        );
        program.build();
        assert!(program.valid(), "{:?}", program.errors());
        accel.special().set_named(SpecReg::VLEN, 1);
        accel.run(program).unwrap();
    }
}
