//! General-purpose and special register files.
//!
//! The original `Registers` type backs both files with a flat array and
//! special-cases three status registers (`PEGRESS`, `AEGRESS`, `MEGRESS`):
//! reading one of them clears it back to zero, so a unit can poll "did the
//! producer finish" without a separate acknowledgement instruction. Every
//! other register is a plain load/store cell. We keep that read-clears
//! behavior and back every slot with an atomic so reads and writes from
//! different unit threads never tear, without needing a lock per access.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::ResourceError;
use crate::spec_reg::SpecReg;

const NUM_COMMON_REGS: u32 = 256;
const NUM_SPEC_REGS: u32 = 256;

pub struct GeneralRegs {
    slots: Vec<AtomicI64>,
}

impl GeneralRegs {
    pub fn new() -> Self {
        GeneralRegs {
            slots: (0..NUM_COMMON_REGS).map(|_| AtomicI64::new(0)).collect(),
        }
    }

    pub fn get(&self, idx: u32) -> Result<i64, ResourceError> {
        self.slots
            .get(idx as usize)
            .map(|s| s.load(Ordering::SeqCst))
            .ok_or(ResourceError::InvalidRegister(idx))
    }

    pub fn set(&self, idx: u32, value: i64) -> Result<(), ResourceError> {
        self.slots
            .get(idx as usize)
            .map(|s| s.store(value, Ordering::SeqCst))
            .ok_or(ResourceError::InvalidRegister(idx))
    }
}

impl Default for GeneralRegs {
    fn default() -> Self {
        Self::new()
    }
}

/// The three egress status registers that auto-clear on read.
fn autoclears(idx: u32) -> bool {
    idx == SpecReg::PEGRESS.index()
        || idx == SpecReg::AEGRESS.index()
        || idx == SpecReg::MEGRESS.index()
}

pub struct SpecRegs {
    slots: Vec<AtomicI64>,
}

impl SpecRegs {
    pub fn new() -> Self {
        let mut slots: Vec<AtomicI64> = (0..NUM_SPEC_REGS).map(|_| AtomicI64::new(0)).collect();
        // VERSION is read-only firmware identity, fixed at construction.
        slots[SpecReg::VERSION.index() as usize] = AtomicI64::new(0x0_0001_0000); // "0.1.0"
        SpecRegs { slots }
    }

    pub fn get(&self, idx: u32) -> Result<i64, ResourceError> {
        let slot = self
            .slots
            .get(idx as usize)
            .ok_or(ResourceError::InvalidRegister(idx))?;
        if autoclears(idx) {
            Ok(slot.swap(0, Ordering::SeqCst))
        } else {
            Ok(slot.load(Ordering::SeqCst))
        }
    }

    pub fn get_named(&self, reg: SpecReg) -> i64 {
        self.get(reg.index()).expect("SpecReg index always valid")
    }

    pub fn set(&self, idx: u32, value: i64) -> Result<(), ResourceError> {
        self.slots
            .get(idx as usize)
            .map(|s| s.store(value, Ordering::SeqCst))
            .ok_or(ResourceError::InvalidRegister(idx))
    }

    pub fn set_named(&self, reg: SpecReg, value: i64) {
        self.set(reg.index(), value)
            .expect("SpecReg index always valid")
    }
}

impl Default for SpecRegs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn egress_registers_clear_on_read() {
        let regs = SpecRegs::new();
        regs.set_named(SpecReg::PEGRESS, 1);
        assert_eq!(regs.get_named(SpecReg::PEGRESS), 1);
        assert_eq!(regs.get_named(SpecReg::PEGRESS), 0);
    }

    #[test]
    fn ordinary_registers_do_not_clear_on_read() {
        let regs = SpecRegs::new();
        regs.set_named(SpecReg::ULEN, 7);
        assert_eq!(regs.get_named(SpecReg::ULEN), 7);
        assert_eq!(regs.get_named(SpecReg::ULEN), 7);
    }

    #[test]
    fn general_regs_round_trip() {
        let regs = GeneralRegs::new();
        regs.set(42, -5).unwrap();
        assert_eq!(regs.get(42).unwrap(), -5);
    }
}
