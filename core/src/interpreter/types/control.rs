//! Control flow signals and runtime errors

use super::values::Val;
use thiserror::Error;

/* ===================== Control Flow ===================== */

/// Completion of one statement
///
/// Thrown values do not travel here: they ride the `Err` side as
/// [`RuntimeError::UserThrow`] so `?` unwinds them through every caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Normal(Val),
    Return(Val),
    Break(Option<String>),    // Optional loop label
    Continue(Option<String>), // Optional loop label
}

impl Control {
    pub fn normal() -> Self {
        Control::Normal(Val::Undefined)
    }

    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Control::Normal(_))
    }
}

/* ===================== Errors ===================== */

/// Runtime failure
///
/// Only `UserThrow` can be intercepted by an interpreted `try`; every other
/// variant ends the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("ReferenceError: {name} is not defined")]
    ReferenceNotFound { name: String, line: usize },

    #[error("TypeError: {message}")]
    TypeMisuse { message: String, line: usize },

    /// `message` is the thrown value rendered at throw time
    #[error("Uncaught {message}")]
    UserThrow {
        value: Val,
        message: String,
        line: usize,
    },

    #[error("Execution exceeded {limit} steps (possible infinite loop)")]
    StepLimitExceeded { limit: usize },

    #[error("RangeError: Maximum call stack size exceeded")]
    CallDepthExceeded { limit: usize },
}

impl RuntimeError {
    pub fn type_misuse(message: impl Into<String>, line: usize) -> Self {
        RuntimeError::TypeMisuse {
            message: message.into(),
            line,
        }
    }

    /// Source line the error is attributed to, when known
    pub fn line(&self) -> Option<usize> {
        match self {
            RuntimeError::ReferenceNotFound { line, .. }
            | RuntimeError::TypeMisuse { line, .. }
            | RuntimeError::UserThrow { line, .. } => Some(*line),
            RuntimeError::StepLimitExceeded { .. } | RuntimeError::CallDepthExceeded { .. } => {
                None
            }
        }
    }

    pub fn is_catchable(&self) -> bool {
        matches!(self, RuntimeError::UserThrow { .. })
    }
}

pub type ExecResult<T> = Result<T, RuntimeError>;
