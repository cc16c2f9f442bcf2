//! Event and state types for the shared-video event system
//!
//! Inbound: [`AuthoritativeState`] snapshots delivered by the session owner.
//! Outbound: [`PlayerEvent`] notifications emitted by the local player.

use serde::{Deserialize, Serialize};

/// Playback status as carried in the authoritative state
///
/// Serialized as `"play"` / `"pause"` to match the state payload sent by the
/// session owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlaybackStatus {
    #[serde(rename = "play")]
    Playing,
    #[default]
    #[serde(rename = "pause")]
    Paused,
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackStatus::Playing => write!(f, "play"),
            PlaybackStatus::Paused => write!(f, "pause"),
        }
    }
}

/// Externally owned playback state treated as ground truth
///
/// Immutable snapshot per update. The player never mutates it; it only
/// compares successive snapshots field by field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoritativeState {
    /// Media URL currently shared (None when nothing is shared yet)
    #[serde(default)]
    pub video_id: Option<String>,
    /// Target position in seconds (None is treated as 0 when applied)
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub status: PlaybackStatus,
    #[serde(default)]
    pub muted: bool,
}

impl AuthoritativeState {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: Some(video_id.into()),
            ..Default::default()
        }
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_status(mut self, status: PlaybackStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    /// Video ID with empty strings normalized to None
    pub fn source_url(&self) -> Option<&str> {
        self.video_id.as_deref().filter(|url| !url.is_empty())
    }
}

/// Classification of a failure escalated to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalErrorKind {
    /// No adaptive engine and no native manifest support
    UnsupportedDelivery,
    /// Adaptive engine reported an unrecoverable network or media error
    FatalStream,
    /// The media renderer itself reported an error
    MediaElement,
}

impl std::fmt::Display for FatalErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FatalErrorKind::UnsupportedDelivery => write!(f, "unsupported delivery"),
            FatalErrorKind::FatalStream => write!(f, "fatal stream error"),
            FatalErrorKind::MediaElement => write!(f, "media element error"),
        }
    }
}

/// Outbound player events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Fatal failure occurred; the host decides what to show the user
    FatalError {
        kind: FatalErrorKind,
        details: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Local renderer started playing
    Played {
        time: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Local renderer paused (or reached the end of the media)
    Paused {
        time: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Local volume or mute flag changed
    VolumeChanged {
        volume: f64,
        muted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Local position update, forwarded only by the session owner
    TimeUpdate {
        video_id: Option<String>,
        time: f64,
        status: PlaybackStatus,
        muted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Short event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::FatalError { .. } => "FatalError",
            PlayerEvent::Played { .. } => "Played",
            PlayerEvent::Paused { .. } => "Paused",
            PlayerEvent::VolumeChanged { .. } => "VolumeChanged",
            PlayerEvent::TimeUpdate { .. } => "TimeUpdate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&PlaybackStatus::Playing).unwrap(), "\"play\"");
        assert_eq!(serde_json::to_string(&PlaybackStatus::Paused).unwrap(), "\"pause\"");

        let status: PlaybackStatus = serde_json::from_str("\"pause\"").unwrap();
        assert_eq!(status, PlaybackStatus::Paused);
    }

    #[test]
    fn test_state_deserializes_owner_payload() {
        let json = r#"{"videoId":"https://cdn.example/a.m3u8","time":12.5,"status":"play","muted":true}"#;
        let state: AuthoritativeState = serde_json::from_str(json).unwrap();

        assert_eq!(state.video_id.as_deref(), Some("https://cdn.example/a.m3u8"));
        assert_eq!(state.time, Some(12.5));
        assert_eq!(state.status, PlaybackStatus::Playing);
        assert!(state.muted);
    }

    #[test]
    fn test_state_missing_fields_default() {
        let state: AuthoritativeState = serde_json::from_str(r#"{"status":"pause"}"#).unwrap();
        assert_eq!(state.video_id, None);
        assert_eq!(state.time, None);
        assert!(!state.muted);
    }

    #[test]
    fn test_source_url_ignores_empty() {
        let state = AuthoritativeState::new("");
        assert_eq!(state.source_url(), None);

        let state = AuthoritativeState::new("clip.mp4");
        assert_eq!(state.source_url(), Some("clip.mp4"));
    }

    #[test]
    fn test_event_tagged_serialization() {
        let event = PlayerEvent::FatalError {
            kind: FatalErrorKind::UnsupportedDelivery,
            details: "no engine".to_string(),
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "FatalError");
        assert_eq!(json["kind"], "unsupported_delivery");
        assert_eq!(event.name(), "FatalError");
    }
}
