//! Error types for reel-player
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. The playback controller itself never returns these to its
//! callers; failures there degrade to "nothing plays" and are logged.

use reel_common::model::EpisodeId;
use thiserror::Error;

/// Main error type for reel-player
#[derive(Error, Debug)]
pub enum Error {
    /// Errors bubbled up from reel-common (config, decode, io)
    #[error(transparent)]
    Common(#[from] reel_common::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport-level HTTP failure (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success HTTP status
    #[error("API error {0}: {1}")]
    ApiStatus(u16, String),

    /// Backend answered 2xx but flagged the envelope as an error
    #[error("Backend reported an error for {0}")]
    Backend(String),

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Media URL missing, undecodable or malformed
    #[error("Invalid media for episode {episode_id}: {reason}")]
    InvalidMedia { episode_id: EpisodeId, reason: String },

    /// Episode requires an entitlement the user does not have
    #[error("Episode {0} requires a subscription")]
    Paywalled(EpisodeId),

    /// Purchase could not be completed
    #[error("Purchase error: {0}")]
    Purchase(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Feed driver is gone or did not answer
    #[error("Feed driver unavailable: {0}")]
    DriverGone(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using reel-player Error
pub type Result<T> = std::result::Result<T, Error>;
