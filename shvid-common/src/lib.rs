//! # Shared Video Common Library
//!
//! Shared code for the shared-video playback crates including:
//! - Authoritative playback state types
//! - Outbound player events (PlayerEvent enum)
//! - Configuration file resolution
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{AuthoritativeState, FatalErrorKind, PlaybackStatus, PlayerEvent};
