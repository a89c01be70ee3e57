use thiserror::Error;

/// Error type for input loop construction and lifecycle operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// No update callback was provided.
    #[error("update callback is not set")]
    MissingCallback,
    /// Frequency must be at least 1 Hz.
    #[error("frequency must be positive, got {0} Hz")]
    InvalidFrequency(u32),
    /// The loop has been disposed and cannot be started again.
    #[error("input loop is disposed")]
    Disposed,
    /// The OS refused to spawn one of the loop threads.
    #[error("failed to spawn loop thread: {0}")]
    Spawn(String),
}

/// Convenient result alias for input loop operations.
pub type Result<T> = std::result::Result<T, Error>;
