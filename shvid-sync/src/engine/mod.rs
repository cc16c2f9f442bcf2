//! Adaptive streaming engine boundary
//!
//! The engine (an HLS client) owns manifest loading, segment fetching and
//! retry. The player only constructs it, binds it to a renderer, listens to
//! its error stream and releases it.

pub mod simulated;

use crate::config::EngineSettings;
use crate::renderer::MediaRenderer;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

pub use simulated::{EngineCall, EngineProbe, SimulatedEngineProvider};

/// Construction options for an engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub low_latency: bool,
    pub worker_demux: bool,
}

impl From<&EngineSettings> for EngineOptions {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            low_latency: settings.low_latency,
            worker_demux: settings.worker_demux,
        }
    }
}

/// Broad category of an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    Network,
    Media,
    #[default]
    Other,
}

impl std::fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineErrorKind::Network => write!(f, "network"),
            EngineErrorKind::Media => write!(f, "media"),
            EngineErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Error reported by an engine, either on its error stream or from a call
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} error (fatal: {fatal}): {details}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    /// Only fatal errors end the session; the engine recovers from the rest
    pub fatal: bool,
    pub details: String,
}

impl EngineError {
    pub fn fatal(kind: EngineErrorKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            fatal: true,
            details: details.into(),
        }
    }

    pub fn recoverable(kind: EngineErrorKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            fatal: false,
            details: details.into(),
        }
    }
}

/// One engine instance bound to at most one renderer
pub trait AdaptiveEngine: Send {
    /// Subscribe to the engine's error stream
    ///
    /// Dropping the receiver detaches the subscription; the engine must treat
    /// a closed channel as "nobody is listening".
    fn subscribe_errors(&mut self) -> mpsc::UnboundedReceiver<EngineError>;

    /// Start loading the manifest at `url`
    fn load_source(&mut self, url: &str) -> Result<(), EngineError>;

    /// Bind the engine's output to a renderer
    fn attach_media(&mut self, renderer: &mut dyn MediaRenderer) -> Result<(), EngineError>;

    /// Release all engine resources
    fn destroy(&mut self) -> Result<(), EngineError>;
}

/// Host capability query plus engine factory
pub trait EngineProvider: Send + Sync {
    /// Whether an adaptive engine can run in this environment
    fn is_supported(&self) -> bool;

    fn create(&self, options: EngineOptions) -> Box<dyn AdaptiveEngine>;
}
