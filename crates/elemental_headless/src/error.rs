//! Error types for the headless runner.

use elemental_core::error::GameError;
use thiserror::Error;

/// Errors raised while loading inputs or running matches.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(String),
    /// Failed to read or write a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse RON: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Failed to encode or decode JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The simulation rejected the setup.
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Result alias for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
