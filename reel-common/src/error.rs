//! Common error types for Reel

use thiserror::Error;

/// Common result type for Reel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared across Reel crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Obfuscated payload could not be turned back into text
    #[error("Decode error: {0}")]
    Decode(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
