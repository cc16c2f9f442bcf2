//! In-memory renderer back end
//!
//! Behaves like a media element closely enough to drive the player without a
//! real decoder: it tracks source, position, pause and mute flags, and records
//! every call. A [`RendererProbe`] shares the same state so callers can inspect
//! or reconfigure the renderer after handing it to the player.

use super::MediaRenderer;
use crate::error::RendererError;
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded renderer call
#[derive(Debug, Clone, PartialEq)]
pub enum RendererCall {
    SetSrc(String),
    RemoveSrc,
    Load,
    Play,
    Pause,
    Seek(f64),
    SetMuted(bool),
    SetControls(bool),
}

/// Point-in-time view of the renderer state
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSnapshot {
    pub src: Option<String>,
    pub paused: bool,
    pub muted: bool,
    pub volume: f64,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub controls: bool,
}

#[derive(Debug)]
struct RendererInner {
    src: Option<String>,
    paused: bool,
    muted: bool,
    volume: f64,
    current_time: f64,
    duration: Option<f64>,
    controls: bool,
    native_mimes: Vec<String>,
    reject_play: bool,
    fail_release: bool,
    calls: Vec<RendererCall>,
}

impl RendererInner {
    fn snapshot(&self) -> RendererSnapshot {
        RendererSnapshot {
            src: self.src.clone(),
            paused: self.paused,
            muted: self.muted,
            volume: self.volume,
            current_time: self.current_time,
            duration: self.duration,
            controls: self.controls,
        }
    }
}

fn lock(inner: &Mutex<RendererInner>) -> MutexGuard<'_, RendererInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Renderer back end backed by shared in-memory state
#[derive(Debug)]
pub struct SimulatedRenderer {
    inner: Arc<Mutex<RendererInner>>,
}

/// Inspection and fault-injection handle for a [`SimulatedRenderer`]
#[derive(Debug, Clone)]
pub struct RendererProbe {
    inner: Arc<Mutex<RendererInner>>,
}

impl SimulatedRenderer {
    /// New paused renderer with no source and no native manifest support
    pub fn new() -> (Self, RendererProbe) {
        let inner = Arc::new(Mutex::new(RendererInner {
            src: None,
            paused: true,
            muted: false,
            volume: 1.0,
            current_time: 0.0,
            duration: None,
            controls: false,
            native_mimes: Vec::new(),
            reject_play: false,
            fail_release: false,
            calls: Vec::new(),
        }));
        (
            Self {
                inner: Arc::clone(&inner),
            },
            RendererProbe { inner },
        )
    }

    /// Renderer that reports native support for the given MIME type
    pub fn with_native_support(mime: &str) -> (Self, RendererProbe) {
        let (renderer, probe) = Self::new();
        probe.add_native_mime(mime);
        (renderer, probe)
    }
}

impl MediaRenderer for SimulatedRenderer {
    fn set_src(&mut self, url: &str) -> Result<(), RendererError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(RendererCall::SetSrc(url.to_string()));
        if url.is_empty() {
            return Err(RendererError::InvalidSource("empty url".to_string()));
        }
        inner.src = Some(url.to_string());
        inner.current_time = 0.0;
        Ok(())
    }

    fn remove_src(&mut self) -> Result<(), RendererError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(RendererCall::RemoveSrc);
        if inner.fail_release {
            return Err(RendererError::ReleaseFailed("remove src".to_string()));
        }
        inner.src = None;
        Ok(())
    }

    fn load(&mut self) -> Result<(), RendererError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(RendererCall::Load);
        if inner.fail_release {
            return Err(RendererError::ReleaseFailed("load".to_string()));
        }
        inner.current_time = 0.0;
        inner.duration = None;
        inner.paused = true;
        Ok(())
    }

    fn play(&mut self) -> Result<(), RendererError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(RendererCall::Play);
        if inner.reject_play {
            return Err(RendererError::PlaybackRejected(
                "autoplay blocked without user gesture".to_string(),
            ));
        }
        inner.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), RendererError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(RendererCall::Pause);
        if inner.fail_release {
            return Err(RendererError::ReleaseFailed("pause".to_string()));
        }
        inner.paused = true;
        Ok(())
    }

    fn is_paused(&self) -> bool {
        lock(&self.inner).paused
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut inner = lock(&self.inner);
        inner.calls.push(RendererCall::Seek(seconds));
        inner.current_time = seconds;
    }

    fn current_time(&self) -> Option<f64> {
        Some(lock(&self.inner).current_time)
    }

    fn duration(&self) -> Option<f64> {
        lock(&self.inner).duration
    }

    fn volume(&self) -> Option<f64> {
        Some(lock(&self.inner).volume)
    }

    fn is_muted(&self) -> bool {
        lock(&self.inner).muted
    }

    fn set_muted(&mut self, muted: bool) {
        let mut inner = lock(&self.inner);
        inner.calls.push(RendererCall::SetMuted(muted));
        inner.muted = muted;
    }

    fn can_play_type(&self, mime: &str) -> bool {
        lock(&self.inner)
            .native_mimes
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime))
    }

    fn set_controls(&mut self, enabled: bool) {
        let mut inner = lock(&self.inner);
        inner.calls.push(RendererCall::SetControls(enabled));
        inner.controls = enabled;
    }
}

impl RendererProbe {
    pub fn snapshot(&self) -> RendererSnapshot {
        lock(&self.inner).snapshot()
    }

    /// All calls recorded so far, oldest first
    pub fn calls(&self) -> Vec<RendererCall> {
        lock(&self.inner).calls.clone()
    }

    /// Number of recorded calls matching a predicate
    pub fn count(&self, predicate: impl Fn(&RendererCall) -> bool) -> usize {
        lock(&self.inner).calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        lock(&self.inner).calls.clear();
    }

    pub fn add_native_mime(&self, mime: &str) {
        lock(&self.inner).native_mimes.push(mime.to_string());
    }

    /// Make every subsequent play() fail like a blocked autoplay
    pub fn set_reject_play(&self, reject: bool) {
        lock(&self.inner).reject_play = reject;
    }

    /// Make pause/remove_src/load fail
    pub fn set_fail_release(&self, fail: bool) {
        lock(&self.inner).fail_release = fail;
    }

    /// Simulate media progress (duration known, position advanced)
    pub fn set_progress(&self, current_time: f64, duration: Option<f64>) {
        let mut inner = lock(&self.inner);
        inner.current_time = current_time;
        inner.duration = duration;
    }

    /// Simulate a local volume change made through native controls
    pub fn set_volume(&self, volume: f64) {
        lock(&self.inner).volume = volume.clamp(0.0, 1.0);
    }
}
