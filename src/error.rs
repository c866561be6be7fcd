//! Error types for arcade-core.

use thiserror::Error;

/// Result type alias for evaluator operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors raised by the arithmetic evaluator.
///
/// These never poison the evaluator: each failing operation also arms a
/// transient error display that reverts to a zeroed accumulator, and the
/// machine stays usable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("cannot divide by zero")]
    DivisionByZero,

    #[error("{op} is undefined for {value}")]
    Domain { op: &'static str, value: f64 },

    #[error("invalid number: {text}")]
    Parse { text: String },
}

/// Errors from the key-value store backing the best-time record.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("corrupt value for key {key}: {value}")]
    CorruptValue { key: String, value: String },
}
