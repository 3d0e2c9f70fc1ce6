//! Error types for the shell element core

use thiserror::Error;

/// Main error type for shell element construction and setup.
///
/// Evaluation itself never returns errors: a degenerate geometry surfaces as a
/// non-positive (or NaN) integration measure, and the caller decides how to
/// react. Everything that can be validated up front is validated here.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("strain model expects {model} tying fields but basis provides {basis}")]
    TyingFieldMismatch { model: usize, basis: usize },

    #[error("element exceeds fixed scratch capacity: {0}")]
    CapacityExceeded(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for shell element operations
pub type ShellResult<T> = Result<T, ShellError>;
