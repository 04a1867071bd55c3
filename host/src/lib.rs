pub mod assembler;
pub mod device;
pub mod error;
pub mod irq;
pub mod queue;

pub use error::HostError;
