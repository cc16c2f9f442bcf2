//! Adaptive stream session
//!
//! A [`StreamSession`] owns at most one adaptive engine instance bound to one
//! renderer and one manifest source.
//!
//! **Lifecycle:** `Uninitialized → Attaching → Attached → (Error | Destroyed)`.
//! `Destroyed` is terminal; a new source always gets a fresh session.
//!
//! **Delivery tiers** (evaluated in order by [`StreamSession::start`]):
//! 1. Adaptive engine supported: engine loads the manifest and feeds the renderer
//! 2. Renderer plays the manifest natively: renderer src is the manifest URL
//! 3. Neither: fatal `UnsupportedDelivery`, no playback attempted

use super::escalator::ErrorEscalator;
use super::{best_effort, request_playback, reset_renderer};
use crate::config::EngineSettings;
use crate::engine::{AdaptiveEngine, EngineError, EngineOptions, EngineProvider};
use crate::error::{Error, Result};
use crate::renderer::MediaRenderer;
use crate::source::Source;
use shvid_common::events::FatalErrorKind;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Attaching,
    Attached,
    Error,
    Destroyed,
}

/// How an attached session delivers media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Adaptive engine feeds the renderer
    Engine,
    /// Renderer plays the manifest itself
    Native,
}

/// One adaptive source bound to one renderer
pub struct StreamSession {
    id: Uuid,
    source: Source,
    state: SessionState,
    delivery: Option<Delivery>,
    engine: Option<Box<dyn AdaptiveEngine>>,
    errors: Option<mpsc::UnboundedReceiver<EngineError>>,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("state", &self.state)
            .field("delivery", &self.delivery)
            .field("engine", &self.engine.is_some())
            .field("subscribed", &self.errors.is_some())
            .finish()
    }
}

impl StreamSession {
    pub fn new(source: Source) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            state: SessionState::Uninitialized,
            delivery: None,
            engine: None,
            errors: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn delivery(&self) -> Option<Delivery> {
        self.delivery
    }

    /// Whether an engine instance is currently held
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Bind the source to the renderer using the best available tier
    ///
    /// Fatal outcomes are escalated and leave the session in `Error`; the
    /// returned error only signals a misuse (non-adaptive source, session
    /// already started).
    pub fn start(
        &mut self,
        renderer: &mut dyn MediaRenderer,
        engines: &dyn EngineProvider,
        settings: &EngineSettings,
        escalator: &ErrorEscalator,
    ) -> Result<()> {
        if !self.source.is_adaptive() {
            return Err(Error::Engine(format!(
                "session requires an adaptive source, got {}",
                self.source.url
            )));
        }
        if self.state != SessionState::Uninitialized {
            return Err(Error::Engine(format!(
                "session {} already started (state {:?})",
                self.id, self.state
            )));
        }

        self.state = SessionState::Attaching;

        if engines.is_supported() {
            self.start_engine(renderer, engines, settings, escalator);
        } else if renderer.can_play_type(&settings.native_mime) {
            self.start_native(renderer, escalator);
        } else {
            self.state = SessionState::Error;
            escalator.escalate(
                FatalErrorKind::UnsupportedDelivery,
                format!(
                    "no adaptive engine and no native {} support for {}",
                    settings.native_mime, self.source.url
                ),
            );
        }
        Ok(())
    }

    fn start_engine(
        &mut self,
        renderer: &mut dyn MediaRenderer,
        engines: &dyn EngineProvider,
        settings: &EngineSettings,
        escalator: &ErrorEscalator,
    ) {
        let mut engine = engines.create(EngineOptions::from(settings));
        self.errors = Some(engine.subscribe_errors());

        let bound = engine
            .load_source(&self.source.url)
            .and_then(|_| engine.attach_media(renderer));
        self.engine = Some(engine);

        if let Err(e) = bound {
            self.fail(escalator, e);
            return;
        }

        self.state = SessionState::Attached;
        self.delivery = Some(Delivery::Engine);
        info!("Session {} attached via adaptive engine: {}", self.id, self.source.url);

        request_playback(renderer);
    }

    fn start_native(&mut self, renderer: &mut dyn MediaRenderer, escalator: &ErrorEscalator) {
        if let Err(e) = renderer.set_src(&self.source.url) {
            self.state = SessionState::Error;
            escalator.escalate(
                FatalErrorKind::MediaElement,
                format!("native manifest playback refused: {}", e),
            );
            return;
        }

        self.state = SessionState::Attached;
        self.delivery = Some(Delivery::Native);
        info!("Session {} attached via native playback: {}", self.id, self.source.url);

        request_playback(renderer);
    }

    /// Drain errors reported by the engine since the last call
    ///
    /// Recoverable errors are logged and dropped. The first fatal error moves
    /// the session to `Error`, is escalated once, and releases the engine so
    /// nothing queued behind it is escalated. Returns the number of
    /// escalations made.
    pub fn handle_engine_errors(&mut self, escalator: &ErrorEscalator) -> usize {
        loop {
            let Some(errors) = self.errors.as_mut() else {
                return 0;
            };
            match errors.try_recv() {
                Ok(err) => {
                    if self.handle_engine_error(escalator, err) {
                        return 1;
                    }
                }
                Err(TryRecvError::Empty) => return 0,
                Err(TryRecvError::Disconnected) => {
                    debug!("Session {} engine error stream closed", self.id);
                    self.errors = None;
                    return 0;
                }
            }
        }
    }

    /// Wait for the next engine error and handle it
    ///
    /// Pends forever once no subscription is live, so it can sit in a
    /// `tokio::select!` arm. Cancel safe. Returns the number of escalations
    /// made (0 or 1).
    pub async fn next_engine_error(&mut self, escalator: &ErrorEscalator) -> usize {
        let Some(errors) = self.errors.as_mut() else {
            return std::future::pending().await;
        };
        match errors.recv().await {
            Some(err) => usize::from(self.handle_engine_error(escalator, err)),
            None => {
                debug!("Session {} engine error stream closed", self.id);
                self.errors = None;
                std::future::pending().await
            }
        }
    }

    /// Returns true when the error was fatal and escalated
    fn handle_engine_error(&mut self, escalator: &ErrorEscalator, err: EngineError) -> bool {
        if !err.fatal {
            debug!("Session {} recoverable engine error: {}", self.id, err);
            return false;
        }
        self.fail(escalator, err);
        true
    }

    fn fail(&mut self, escalator: &ErrorEscalator, err: EngineError) {
        self.state = SessionState::Error;
        self.release_engine();
        escalator.escalate(
            FatalErrorKind::FatalStream,
            format!("{} ({})", err, self.source.url),
        );
    }

    /// Detach the error subscription, then destroy the engine
    fn release_engine(&mut self) {
        self.errors = None;
        if let Some(mut engine) = self.engine.take() {
            best_effort("engine destroy", engine.destroy());
        }
    }

    /// Tear the session down
    ///
    /// Idempotent and valid from every state. Releases the engine, detaches
    /// the error subscription, then pauses the renderer and clears its source.
    /// Release failures are logged and discarded.
    pub fn stop(&mut self, renderer: Option<&mut dyn MediaRenderer>) {
        if self.state == SessionState::Destroyed {
            return;
        }

        self.release_engine();
        if let Some(renderer) = renderer {
            reset_renderer(renderer);
        }

        debug!("Session {} destroyed (was {:?})", self.id, self.state);
        self.state = SessionState::Destroyed;
        self.delivery = None;
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if self.engine.is_some() {
            warn!("Session {} dropped without stop, releasing engine", self.id);
            self.release_engine();
        }
    }
}
