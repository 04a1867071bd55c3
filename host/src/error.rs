//! Host-level error wrapper unifying the core's three error enums behind
//! one type the CLI can match on and report through a single exit path.

use thiserror::Error;

use tvacc_core::error::{ProgramError, ResourceError, RunError};

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Run(#[from] RunError),
}
