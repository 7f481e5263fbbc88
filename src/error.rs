//! Engine Errors
//!
//! Errors raised by the engine itself: bad configuration, storage and
//! envelope problems. Failures raised *inside* an action never surface
//! here; they are converted into a `failed` status at the action boundary.

use thiserror::Error;

/// Boxed error type returned by action implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The action kind is not registered (or is not a valid kind string).
    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    /// The action parameters failed validation for its kind.
    #[error("Invalid parameters for action '{name}' ({kind}): {reason}")]
    InvalidParameters {
        kind: String,
        name: String,
        reason: String,
    },

    /// The action definition itself is malformed.
    #[error("Invalid action definition: {0}")]
    InvalidSpec(String),

    /// A lifecycle hook declares a type the engine does not know.
    #[error("Unsupported hook type '{hook_type}' on action '{action}'")]
    UnsupportedHook { action: String, hook_type: String },

    /// The invocation envelope could not be parsed or is incomplete.
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Reading or writing a stored document failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored document has a content type we cannot decode or encode.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// A template could not be rendered.
    #[error("Render error: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl EngineError {
    /// Returns true for errors caused by invalid configuration.
    ///
    /// Configuration errors are never retried; they end the invocation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownAction(_)
                | Self::InvalidParameters { .. }
                | Self::InvalidSpec(_)
                | Self::UnsupportedHook { .. }
                | Self::InvalidEnvelope(_)
        )
    }
}

/// Convenience result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
