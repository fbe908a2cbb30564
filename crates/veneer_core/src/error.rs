//! Core error types

use thiserror::Error;

/// Errors raised by core value and event helpers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// An event name did not match any known pointer event
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// A value had a different shape than the caller required
    #[error("expected a {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
