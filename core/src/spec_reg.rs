//! The accelerator's special-register file.
//!
//! Variant order matters: [`SpecReg::index`] (generated by
//! `#[derive(SpecRegName)]`) is the variant's declaration position, and that
//! position is the flat offset into the special-register file the firmware
//! expects. Do not reorder these without also checking every constant that
//! was derived from the device's original register map.
//!
//! Names are kept in the device's own `SCREAMING_CASE` rather than
//! renamed to Rust's usual `UpperCamelCase`, since they double as the
//! mnemonic tokens the assembler parses (`MOVID $RET, #0x1`).

#![allow(non_camel_case_types)]

use tvacc_macros::SpecRegName;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, SpecRegName)]
pub enum SpecReg {
    VERSION,
    FFAULTS,
    FTRIM,
    STATUS,
    TASKID,
    TASKCC,
    PROGH,
    PROGL,
    GCCH,
    GCCL,
    TBD,
    RET,
    LWGAP,
    LWIDTH,
    LHGAP,
    LHEIGHT,
    SWGAP,
    SWIDTH,
    SHGAP,
    SHEIGHT,
    MSIZE,
    NSIZE,
    KSIZE,
    DWGAP,
    RWGAP,
    PEGRESS,
    AEGRESS,
    MEGRESS,
    ULEN,
    VLEN,
    VSHIFT,
    FWD_TMP,
    X_PAD_0,
    Y_PAD_0,
    X_PAD_1,
    Y_PAD_1,
    NDIM,
    X_SIZE,
    Y_SIZE,
    Z_SIZE,
    X_AXIS,
    Y_AXIS,
    Z_AXIS,
    X_STRIDE,
    RESET_ACC,
    EXTENT,
    ACCUM_OFFSET,
    CONST_OFFSET,
    INPUT_OFFSET,
}

impl SpecReg {
    /// Number of special registers backing the whole enum (including the
    /// ones not yet assigned a variant).
    pub const COUNT: u32 = 256;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_name() {
        for i in 0..49u32 {
            let reg = SpecReg::from_index(i).expect("index in range");
            let by_name = SpecReg::from_name(reg.name()).expect("name resolves back");
            assert_eq!(reg, by_name);
            assert_eq!(reg.index(), i);
        }
    }

    #[test]
    fn version_is_register_zero() {
        assert_eq!(SpecReg::VERSION.index(), 0);
        assert_eq!(SpecReg::VERSION.name(), "VERSION");
    }

    #[test]
    fn fwd_tmp_sits_between_vshift_and_the_padding_block() {
        assert_eq!(SpecReg::VSHIFT.index() + 1, SpecReg::FWD_TMP.index());
        assert_eq!(SpecReg::FWD_TMP.index() + 1, SpecReg::X_PAD_0.index());
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        assert!(SpecReg::from_name("NOT_A_REGISTER").is_none());
    }
}
