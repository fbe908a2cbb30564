//! Animation error types

use thiserror::Error;

/// Errors raised while parsing or compiling animation descriptors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// Easing name did not match a known curve
    #[error("unknown easing: {0}")]
    UnknownEasing(String),

    /// Interpolator name did not match a known interpolator
    #[error("unknown interpolation: {0}")]
    UnknownInterpolation(String),

    /// Spring preset name did not match a known preset
    #[error("unknown spring preset: {0}")]
    UnknownSpringPreset(String),

    /// Keyframe offset outside `0%..=100%` or not parseable
    #[error("invalid keyframe offset: {0}")]
    InvalidKeyframeOffset(String),

    /// Durations must be finite and non-negative
    #[error("invalid duration: {0}")]
    InvalidDuration(f64),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
