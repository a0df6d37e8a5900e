//! Timer error types.

/// Result type for timer operations.
pub type Result<T> = std::result::Result<T, TimerError>;

/// Errors returned by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// Operation on a display that was never started or was torn down
    #[error("timer is not active; call start() first")]
    NotActive,

    /// `start` on a display that is already running
    #[error("timer is already active")]
    AlreadyActive,
}

/// Errors loading a [`crate::TimerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value outside its allowed range
    #[error("invalid config: {0}")]
    Invalid(String),
}
