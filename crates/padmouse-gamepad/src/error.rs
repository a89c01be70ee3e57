use thiserror::Error;

/// Error type for controller management operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to initialize the backend (SDL2 or subsystems).
    #[error("backend init failed: {0}")]
    BackendInit(String),
}

/// Convenient result alias for controller operations.
pub type Result<T> = std::result::Result<T, Error>;
