//! Error types for clonetrack-core.

use thiserror::Error;

/// Result type alias for clonetrack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for clonetrack operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Required day data was empty or missing.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// Configuration error.
    #[error("configuration error: {0}")]
    InvalidConfig(String),
}
