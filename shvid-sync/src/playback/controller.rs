//! Playback commands against the local renderer
//!
//! [`PlaybackController`] is what the reconciler talks to. Each rendering back
//! end gets one implementation; [`ElementController`] covers any
//! [`MediaRenderer`].
//!
//! Every command is a no-op when no renderer is attached, and numeric reads
//! return `NaN` when the value is unavailable.

use super::{best_effort, request_playback};
use crate::renderer::MediaRenderer;
use shvid_common::events::PlaybackStatus;
use tracing::{debug, trace};

/// Command and read-through surface over one rendering back end
pub trait PlaybackController: Send {
    /// Back end owned by this controller
    type Renderer: MediaRenderer;

    /// Take ownership of a renderer, replacing any previous one
    fn attach(&mut self, renderer: Self::Renderer) -> Option<Self::Renderer>;

    /// Give the renderer back to the caller
    fn detach(&mut self) -> Option<Self::Renderer>;

    fn renderer_mut(&mut self) -> Option<&mut dyn MediaRenderer>;

    fn has_renderer(&self) -> bool;

    /// Set position in seconds; no clamping at this layer
    fn seek(&mut self, time: f64);

    /// Request playback start; rejection is not escalated
    fn play(&mut self);

    fn pause(&mut self);

    fn mute(&mut self);

    fn unmute(&mut self);

    /// Playing/Paused from the renderer's paused flag; None without renderer
    fn status(&self) -> Option<PlaybackStatus>;

    fn is_muted(&self) -> Option<bool>;

    fn volume(&self) -> f64;

    fn time(&self) -> f64;

    fn duration(&self) -> f64;
}

/// Controller over a single [`MediaRenderer`] back end
#[derive(Debug)]
pub struct ElementController<R: MediaRenderer> {
    renderer: Option<R>,
}

impl<R: MediaRenderer> ElementController<R> {
    pub fn new() -> Self {
        Self { renderer: None }
    }

    pub fn with_renderer(renderer: R) -> Self {
        Self {
            renderer: Some(renderer),
        }
    }
}

impl<R: MediaRenderer> Default for ElementController<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: MediaRenderer> PlaybackController for ElementController<R> {
    type Renderer = R;

    fn attach(&mut self, renderer: R) -> Option<R> {
        self.renderer.replace(renderer)
    }

    fn detach(&mut self) -> Option<R> {
        self.renderer.take()
    }

    fn renderer_mut(&mut self) -> Option<&mut dyn MediaRenderer> {
        self.renderer.as_mut().map(|r| r as &mut dyn MediaRenderer)
    }

    fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    fn seek(&mut self, time: f64) {
        if let Some(renderer) = self.renderer.as_mut() {
            trace!("Seeking to {}", shvid_common::time::format_position(time));
            renderer.set_current_time(time);
        }
    }

    fn play(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            request_playback(renderer);
        }
    }

    fn pause(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            best_effort("pause", renderer.pause());
        }
    }

    fn mute(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_muted(true);
        }
    }

    fn unmute(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_muted(false);
        }
    }

    fn status(&self) -> Option<PlaybackStatus> {
        let renderer = self.renderer.as_ref()?;
        Some(if renderer.is_paused() {
            PlaybackStatus::Paused
        } else {
            PlaybackStatus::Playing
        })
    }

    fn is_muted(&self) -> Option<bool> {
        self.renderer.as_ref().map(|r| r.is_muted())
    }

    fn volume(&self) -> f64 {
        read_number(self.renderer.as_ref().and_then(|r| r.volume()))
    }

    fn time(&self) -> f64 {
        read_number(self.renderer.as_ref().and_then(|r| r.current_time()))
    }

    fn duration(&self) -> f64 {
        read_number(self.renderer.as_ref().and_then(|r| r.duration()))
    }
}

fn read_number(value: Option<f64>) -> f64 {
    match value {
        Some(v) => v,
        None => {
            debug!("Renderer value unavailable, reporting NaN");
            f64::NAN
        }
    }
}
