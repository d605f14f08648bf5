//! Server error types.

use thiserror::Error;

use skirmish_core::error::GameError;

/// Result type alias using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors raised around the simulation: IO, protocol and batch output.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Reading input or writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A protocol line could not be encoded or decoded.
    #[error("Malformed protocol message: {0}")]
    Protocol(#[from] serde_json::Error),

    /// The simulation refused to start or failed to load.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The stdin reader task stopped abnormally.
    #[error("Input reader failed: {0}")]
    Reader(String),
}
