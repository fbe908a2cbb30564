//! Error types for veneer_facade

use thiserror::Error;
use veneer_animation::AnimationError;
use veneer_core::{CoreError, FacadeId};

/// Errors raised while updating facades or talking to async collaborators
#[derive(Error, Debug)]
pub enum FacadeError {
    /// The id does not name a live facade in this world
    #[error("unknown facade: {0:?}")]
    UnknownFacade(FacadeId),

    /// A facade was asked to write a property it does not have
    #[error("{facade} has no property `{property}`")]
    UnknownProperty {
        facade: &'static str,
        property: String,
    },

    /// A property was written with a value of the wrong shape
    #[error("invalid value for `{property}`: {reason}")]
    InvalidValue { property: String, reason: String },

    /// An interceptor was installed on a property the facade cannot read back
    #[error("{facade} cannot read property `{property}`; it cannot be transitioned or overlaid")]
    PropertyNotReadable {
        facade: &'static str,
        property: String,
    },

    /// Animation descriptor could not be parsed or compiled
    #[error(transparent)]
    Animation(#[from] AnimationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Layout engine failure
    #[error("layout failed: {0}")]
    Layout(String),

    /// Worker module registration or call failure
    #[error("worker error: {0}")]
    Worker(String),

    /// Worker payload could not be encoded or decoded
    #[error("payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),

    /// Configuration could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for veneer_facade operations
pub type Result<T> = std::result::Result<T, FacadeError>;
