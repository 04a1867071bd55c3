pub mod accelerator;
pub mod elem;
pub mod error;
pub mod inst;
pub mod kernels;
pub mod memory;
pub mod path;
pub mod regfile;
pub mod spec_reg;
pub mod unit;

pub mod cu;
pub mod lsu;
pub mod mpu;

pub mod prelude {
    pub use crate::accelerator::Accelerator;
    pub use crate::elem::{Complex32, Complex64, Elem};
    pub use crate::error::{ProgramError, ResourceError};
    pub use crate::inst::{Drive, Instruction, Program, Tag};
    pub use crate::spec_reg::SpecReg;
}
