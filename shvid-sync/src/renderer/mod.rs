//! Media renderer boundary
//!
//! A renderer is the local media-rendering surface (a video element, a native
//! player widget). The player never constructs one; the host hands it over on
//! initialize and gets it back on dispose.

pub mod simulated;

use crate::error::RendererError;
use serde::{Deserialize, Serialize};

pub use simulated::{RendererCall, RendererProbe, RendererSnapshot, SimulatedRenderer};

/// Imperative surface of a media renderer back end
///
/// Fallible calls report failures to the caller; whether a failure matters
/// is decided by the playback layer (most are swallowed there).
pub trait MediaRenderer: Send {
    /// Assign a source URL for direct playback
    fn set_src(&mut self, url: &str) -> Result<(), RendererError>;

    /// Remove the source attribute
    fn remove_src(&mut self) -> Result<(), RendererError>;

    /// Reload the element so a removed source releases its resource
    fn load(&mut self) -> Result<(), RendererError>;

    /// Request playback start. May be rejected by autoplay policy.
    fn play(&mut self) -> Result<(), RendererError>;

    fn pause(&mut self) -> Result<(), RendererError>;

    fn is_paused(&self) -> bool;

    /// Set playback position in seconds. Range handling is the renderer's concern.
    fn set_current_time(&mut self, seconds: f64);

    /// Playback position in seconds, None when unavailable
    fn current_time(&self) -> Option<f64>;

    /// Media duration in seconds, None when unknown
    fn duration(&self) -> Option<f64>;

    /// Volume in 0.0..=1.0, None when unavailable
    fn volume(&self) -> Option<f64>;

    fn is_muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    /// Native support query for a MIME type
    fn can_play_type(&self, mime: &str) -> bool;

    /// Show or hide native playback controls
    fn set_controls(&mut self, _enabled: bool) {}
}

/// Callbacks raised by the renderer itself, forwarded by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererEvent {
    Play,
    Pause,
    Ended,
    VolumeChange,
    TimeUpdate,
    Error,
}
