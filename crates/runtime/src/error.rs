//! Runtime error types.

use ticktrack_timer::TimerError;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors returned by a [`crate::DispatchHandle`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// The reconciler rejected the operation
    #[error(transparent)]
    Timer(#[from] TimerError),

    /// The dispatcher task has shut down
    #[error("dispatcher is closed")]
    Closed,
}
