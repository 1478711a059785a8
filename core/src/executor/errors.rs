//! Error types
//!
//! `VmError` is what callers of `run`/`resume` see. `EvalError` never leaves
//! the executor: expression failures are recovered to `undefined`.

use thiserror::Error;

/// Message used when a `throw` statement carries no `Error("...")` text
pub const DEFAULT_THROW_MESSAGE: &str = "Error";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    /// `resume` called while nothing is suspended
    #[error("No paused fetch with ID {id}")]
    NoLiveContinuation { id: u64 },

    /// `resume` called with an id other than the live one
    #[error("No paused fetch with ID {got} (live continuation is {expected})")]
    ContinuationMismatch { expected: u64, got: u64 },

    /// `run` called while a continuation is live
    #[error("VM is suspended on continuation {id}; resume or dispose it first")]
    AlreadySuspended { id: u64 },

    /// Explicit `throw` statement
    #[error("{message}")]
    Script { message: String },
}

impl VmError {
    /// True for caller mistakes, false for errors raised by the script
    pub fn is_usage(&self) -> bool {
        !matches!(self, VmError::Script { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Failed to parse expression: {0}")]
    Parse(String),

    #[error("{name} is not defined")]
    UndefinedVariable { name: String },

    #[error("Cannot read property '{property}' of {base}")]
    NullishAccess { property: String, base: &'static str },

    #[error("Cannot set property '{property}' on {base}")]
    InvalidAssignmentTarget { property: String, base: String },

    #[error("Expression nests deeper than {limit} levels")]
    TooDeep { limit: usize },
}
