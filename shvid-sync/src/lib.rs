//! # Shared Video Sync Library (shvid-sync)
//!
//! Keeps a participant's local media renderer in lock-step with the playback
//! state owned by the session owner.
//!
//! **Purpose:** Classify the shared source, pick a delivery mechanism
//! (adaptive engine, native manifest playback, or direct progressive
//! playback), apply time/status/mute changes with minimal renderer commands,
//! and escalate only fatal failures.
//!
//! **Architecture:** `SyncReconciler` drives a `PlaybackController` over a
//! `MediaRenderer` and owns at most one `StreamSession` bound to an
//! `AdaptiveEngine`. Outbound notifications are `PlayerEvent`s on a
//! broadcast channel.

pub mod config;
pub mod engine;
pub mod error;
pub mod playback;
pub mod renderer;
pub mod scenario;
pub mod source;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use playback::{ElementController, PlaybackController, SyncReconciler};
pub use source::{classify, Source, SourceKind};
