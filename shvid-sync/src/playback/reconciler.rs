//! Authoritative state reconciliation
//!
//! [`SyncReconciler`] keeps the local renderer in step with the state owned
//! by the session owner. Each incoming snapshot is diffed against the
//! previous one and only the fields that actually changed are applied:
//!
//! | Field changed | Action |
//! |---|---|
//! | `video_id` | `setup_source` (destroy old session, then bind new source) |
//! | `time` | `seek` |
//! | `status` | `pause` / `play` |
//! | `muted` | `mute` / `unmute` |
//!
//! **Lifecycle:** `initialize` (mount), `reconcile`/`apply` (property change),
//! `dispose` (unmount).
//!
//! At most one [`StreamSession`] is live at a time: a new source always stops
//! the previous session before the next one is built.

use super::controller::PlaybackController;
use super::escalator::ErrorEscalator;
use super::session::{SessionState, StreamSession};
use super::throttle::{IntervalThrottle, Throttle};
use super::{best_effort, request_playback, reset_renderer};
use crate::config::SyncConfig;
use crate::engine::EngineProvider;
use crate::renderer::RendererEvent;
use crate::source::{Source, SourceKind};
use shvid_common::events::{AuthoritativeState, FatalErrorKind, PlaybackStatus, PlayerEvent};
use shvid_common::time::format_position;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Outbound event buffer size
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Drives one renderer from authoritative state snapshots
pub struct SyncReconciler<C: PlaybackController> {
    controller: C,
    engines: Arc<dyn EngineProvider>,
    config: SyncConfig,
    session: Option<StreamSession>,
    last_applied: Option<String>,
    current: Option<AuthoritativeState>,
    is_owner: bool,
    throttle: Box<dyn Throttle>,
    event_tx: broadcast::Sender<PlayerEvent>,
    escalator: ErrorEscalator,
}

impl<C: PlaybackController> SyncReconciler<C> {
    pub fn new(controller: C, engines: Arc<dyn EngineProvider>, config: SyncConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let throttle = IntervalThrottle::new(config.telemetry.time_update_interval());
        Self {
            controller,
            engines,
            config,
            session: None,
            last_applied: None,
            current: None,
            is_owner: false,
            throttle: Box::new(throttle),
            escalator: ErrorEscalator::new(event_tx.clone()),
            event_tx,
        }
    }

    /// Replace the outbound time-update throttle
    pub fn with_throttle(mut self, throttle: impl Throttle + 'static) -> Self {
        self.throttle = Box::new(throttle);
        self
    }

    pub fn with_owner(mut self, is_owner: bool) -> Self {
        self.is_owner = is_owner;
        self
    }

    /// Subscribe to outbound player events
    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    /// Ownership only gates native controls and upward event forwarding;
    /// reconciliation is identical either way
    pub fn set_owner(&mut self, is_owner: bool) {
        self.is_owner = is_owner;
        if let Some(renderer) = self.controller.renderer_mut() {
            renderer.set_controls(is_owner);
        }
    }

    pub fn last_applied_source(&self) -> Option<&str> {
        self.last_applied.as_deref()
    }

    pub fn current_state(&self) -> Option<&AuthoritativeState> {
        self.current.as_ref()
    }

    pub fn session(&self) -> Option<&StreamSession> {
        self.session.as_ref()
    }

    pub fn session_state(&self) -> Option<SessionState> {
        self.session.as_ref().map(|s| s.state())
    }

    pub fn escalation_count(&self) -> u64 {
        self.escalator.escalation_count()
    }

    /// Mount: take the renderer and bind the initial source
    ///
    /// Treated as "video changed from none to the initial value"; time, status
    /// and mute are applied by later snapshots. A renderer already attached
    /// is released first, exactly as `dispose` would.
    pub fn initialize(&mut self, renderer: C::Renderer, initial: AuthoritativeState) {
        if self.controller.has_renderer() {
            warn!("Renderer replaced on initialize; releasing the previous binding");
            drop(self.dispose());
        }
        self.controller.attach(renderer);
        let is_owner = self.is_owner;
        if let Some(renderer) = self.controller.renderer_mut() {
            renderer.set_controls(is_owner);
        }

        info!("Initializing with source {:?}", initial.source_url());
        self.setup_source(initial.source_url());
        self.current = Some(initial);
    }

    /// Apply a new snapshot against the last one seen
    pub fn apply(&mut self, new: AuthoritativeState) {
        let previous = self.current.clone().unwrap_or_default();
        self.reconcile(&previous, &new);
    }

    /// Property change: apply every field that differs between snapshots
    pub fn reconcile(&mut self, previous: &AuthoritativeState, new: &AuthoritativeState) {
        // Errors raised while the session was live are escalated before any
        // change can replace it
        self.handle_engine_errors();

        if previous.video_id != new.video_id {
            self.setup_source(new.source_url());
        }

        if previous.time != new.time {
            self.seek_to(new.time.unwrap_or(0.0));
        }

        if previous.status != new.status {
            debug!("Status {} -> {}", previous.status, new.status);
            match new.status {
                PlaybackStatus::Paused => self.controller.pause(),
                PlaybackStatus::Playing => self.controller.play(),
            }
        }

        if previous.muted != new.muted {
            if new.muted {
                self.controller.mute();
            } else {
                self.controller.unmute();
            }
        }

        self.current = Some(new.clone());
    }

    fn seek_to(&mut self, target: f64) {
        let tolerance = self.config.sync.seek_tolerance_secs;
        let position = self.controller.time();
        if tolerance > 0.0 && position.is_finite() && (position - target).abs() <= tolerance {
            debug!(
                "Skipping seek to {}: renderer already at {}",
                format_position(target),
                format_position(position)
            );
            return;
        }
        self.controller.seek(target);
    }

    /// Bind a new source to the renderer
    ///
    /// No-op for an empty URL, for the URL applied last, or without a
    /// renderer. Otherwise the previous session is stopped before anything
    /// new is created.
    pub fn setup_source(&mut self, url: Option<&str>) {
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            debug!("No source to set up");
            return;
        };
        if self.last_applied.as_deref() == Some(url) {
            debug!("Source unchanged, skipping setup: {}", url);
            return;
        }
        if !self.controller.has_renderer() {
            debug!("No renderer attached, deferring source {}", url);
            return;
        }
        let Some(source) = Source::resolve(url) else {
            return;
        };

        self.last_applied = Some(url.to_string());
        self.stop_session();

        let Some(renderer) = self.controller.renderer_mut() else {
            return;
        };
        reset_renderer(renderer);

        match source.kind {
            SourceKind::Adaptive => {
                let mut session = StreamSession::new(source);
                if let Err(e) = session.start(
                    renderer,
                    self.engines.as_ref(),
                    &self.config.engine,
                    &self.escalator,
                ) {
                    warn!("Failed to start stream session: {}", e);
                }
                self.session = Some(session);
            }
            SourceKind::Direct => {
                info!("Direct source: {}", source.url);
                best_effort("direct source assignment", renderer.set_src(&source.url));
                request_playback(renderer);
            }
        }
    }

    fn stop_session(&mut self) {
        self.handle_engine_errors();
        // Taken out first so callbacks arriving during teardown find no session
        if let Some(mut session) = self.session.take() {
            session.stop(self.controller.renderer_mut());
        }
    }

    /// Drain pending engine errors for the live session
    ///
    /// Returns the number of escalations made. Errors from sessions already
    /// stopped are never seen here.
    pub fn handle_engine_errors(&mut self) -> usize {
        match self.session.as_mut() {
            Some(session) => session.handle_engine_errors(&self.escalator),
            None => 0,
        }
    }

    /// Wait for the live session's next engine error and handle it
    ///
    /// Pends while no subscription is live, so hosts can select on it next
    /// to their state feed. Cancel safe. Returns the number of escalations
    /// made.
    pub async fn next_engine_error(&mut self) -> usize {
        match self.session.as_mut() {
            Some(session) => session.next_engine_error(&self.escalator).await,
            None => std::future::pending().await,
        }
    }

    /// Forward a renderer callback upward
    pub fn handle_renderer_event(&mut self, event: RendererEvent) {
        match event {
            RendererEvent::Error => {
                self.escalator.escalate(
                    FatalErrorKind::MediaElement,
                    format!(
                        "renderer reported an error for {}",
                        self.last_applied.as_deref().unwrap_or("<no source>")
                    ),
                );
            }
            RendererEvent::Play => {
                self.emit(PlayerEvent::Played {
                    time: self.controller.time(),
                    timestamp: shvid_common::time::now(),
                });
            }
            // End of media is reported as a pause regardless of ownership
            RendererEvent::Ended => {
                self.emit(PlayerEvent::Paused {
                    time: self.controller.time(),
                    timestamp: shvid_common::time::now(),
                });
            }
            RendererEvent::Pause => {
                if self.is_owner {
                    self.emit(PlayerEvent::Paused {
                        time: self.controller.time(),
                        timestamp: shvid_common::time::now(),
                    });
                }
            }
            RendererEvent::VolumeChange => {
                self.emit(PlayerEvent::VolumeChanged {
                    volume: self.controller.volume(),
                    muted: self.controller.is_muted().unwrap_or(false),
                    timestamp: shvid_common::time::now(),
                });
            }
            RendererEvent::TimeUpdate => {
                if self.is_owner && self.throttle.admit() {
                    self.emit(PlayerEvent::TimeUpdate {
                        video_id: self.last_applied.clone(),
                        time: self.controller.time(),
                        status: self.controller.status().unwrap_or_default(),
                        muted: self.controller.is_muted().unwrap_or(false),
                        timestamp: shvid_common::time::now(),
                    });
                }
            }
        }
    }

    fn emit(&self, event: PlayerEvent) {
        debug!("Emitting {}", event.name());
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Unmount: stop the session, release the renderer's source and hand
    /// the renderer back
    pub fn dispose(&mut self) -> Option<C::Renderer> {
        if self.session.is_some() {
            self.stop_session();
        } else if let Some(renderer) = self.controller.renderer_mut() {
            reset_renderer(renderer);
        }
        self.last_applied = None;
        self.current = None;
        info!("Reconciler disposed");
        self.controller.detach()
    }
}
