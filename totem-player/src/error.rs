//! Error types for totem-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

pub use totem_common::playlist::ConfigError;

/// Playlist snapshot could not be obtained from the provider
///
/// Terminal for the current attempt: the engine reports it as the `Failed`
/// state and never retries on its own.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Backend unreachable, timed out, or connection dropped
    #[error("network error: {0}")]
    Network(String),

    /// Backend does not know this device
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Device exists but has no playlist assigned
    #[error("no playlist assigned to device {0}")]
    NoPlaylistAssigned(String),

    /// Backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body could not be understood
    #[error("malformed playlist payload: {0}")]
    Malformed(String),
}

/// Main error type for totem-player
#[derive(Error, Debug)]
pub enum Error {
    /// Playlist fetch failed
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Outbound HTTP client errors (heartbeat, client construction)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Errors bubbled up from totem-common
    #[error(transparent)]
    Common(#[from] totem_common::Error),
}

/// Convenience Result type using totem-player Error
pub type Result<T> = std::result::Result<T, Error>;
