//! Error types for shvid-sync
//!
//! Only fatal classifications ever leave the player (see
//! `playback::escalator`); renderer failures are absorbed where they occur
//! and reported through [`RendererError`]. The crate [`Error`] covers engine
//! misuse plus configuration and scenario loading.

use thiserror::Error;

/// Main error type for shvid-sync
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON scenario or event payload errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed or unsupported scenario step
    #[error("Scenario error: {0}")]
    Scenario(String),

    /// Adaptive streaming engine failure
    #[error("Engine error: {0}")]
    Engine(String),
}

/// Failures reported by a media renderer back end
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RendererError {
    /// Playback start refused (autoplay policy and similar)
    #[error("playback start rejected: {0}")]
    PlaybackRejected(String),

    /// Operation failed while releasing or resetting a resource
    #[error("release failed: {0}")]
    ReleaseFailed(String),

    /// Source could not be assigned
    #[error("invalid source: {0}")]
    InvalidSource(String),
}

impl From<shvid_common::Error> for Error {
    fn from(err: shvid_common::Error) -> Self {
        match err {
            shvid_common::Error::Io(e) => Error::Io(e),
            other => Error::Config(other.to_string()),
        }
    }
}

/// Convenience Result type using shvid-sync Error
pub type Result<T> = std::result::Result<T, Error>;
