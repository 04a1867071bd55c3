//! Error taxonomy for the accelerator core.
//!
//! The original firmware signaled failures by returning `nullptr` from a
//! `Program::CreateFunc` builder step and printing to stderr. We keep the
//! same three-way split the original's error paths imply (bad program text,
//! resource exhaustion, caller misuse) but make each one a typed `Result`.

use thiserror::Error;

/// Failures while assembling or building a [`crate::inst::Program`].
///
/// These accumulate into [`crate::inst::Program`]'s error list rather than
/// aborting assembly early, matching the original's accumulate-then-report
/// behavior at `Build()` time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("function `{0}` already declared")]
    DuplicateName(String),

    #[error("duplicate label `{0}`")]
    DuplicateLabel(String),

    #[error("function `{0}` was never closed with Ret")]
    MissingRet(String),

    #[error("Call used outside MAIN, in function `{0}`")]
    CallOutsideMain(String),

    #[error("program has no MAIN entry point")]
    NoEntryPoint,

    #[error("unknown label `{0}`")]
    UnknownLabel(String),

    #[error("unknown opcode mnemonic `{0}`")]
    UnknownMnemonic(String),

    #[error("malformed operand in `{0}`")]
    MalformedOperand(String),

    #[error("unknown special register `{0}`")]
    UnknownSpecReg(String),
}

/// Failures caused by exhausting a finite device resource at run time, or
/// addressing one incorrectly. Recoverable by the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("out of DRAM: requested {requested} bytes, {available} available")]
    OutOfDeviceMemory { requested: u32, available: u32 },

    #[error("DRAM address {0:#x} was never allocated")]
    UnknownDramAddress(u32),

    #[error("path index {0} out of range")]
    InvalidPath(usize),

    #[error("register index {0} out of range")]
    InvalidRegister(u32),

    #[error("address {addr:#x} with length {len} falls outside addressable memory")]
    OutOfBounds { addr: u64, len: usize },
}

/// Caller misuse the original implementation would have aborted on. These
/// indicate a bug in program-construction code, not a runtime condition a
/// caller can recover from, so the core panics on them rather than
/// threading a `Result` through every call site.
#[derive(Debug, Error)]
pub enum ProgrammerError {
    #[error("label `{0}` used before the program was built")]
    UseBeforeBuild(String),

    #[error("program is not valid: {0:?}")]
    InvalidProgram(Vec<ProgramError>),

    #[error("buffer `{0}` was never allocated on this queue")]
    UnknownBuffer(String),

    #[error("operand count mismatch for `{op}`: expected {expected}, got {got}")]
    ArityMismatch {
        op: String,
        expected: usize,
        got: usize,
    },
}

/// The top-level error type returned by [`crate::accelerator::Accelerator::run`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error("program failed to build: {0:?}")]
    InvalidProgram(Vec<ProgramError>),
}
