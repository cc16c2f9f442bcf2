//! Scripted playback scenarios
//!
//! A scenario is a JSON document listing what the outside world does to the
//! player: authoritative state updates, engine errors, renderer callbacks,
//! ownership changes, pauses. The runner replays it against a reconciler
//! backed by the simulated engine.
//!
//! ```json
//! {
//!   "owner": false,
//!   "steps": [
//!     { "action": "state", "state": { "videoId": "https://cdn.example/live.m3u8", "status": "play" } },
//!     { "action": "engine_error", "fatal": false, "kind": "media", "details": "buffer stall" },
//!     { "action": "renderer_event", "event": "time_update" },
//!     { "action": "wait", "ms": 250 },
//!     { "action": "dispose" }
//!   ]
//! }
//! ```

use crate::engine::{EngineError, EngineErrorKind, EngineProbe};
use crate::error::{Error, Result};
use crate::playback::{PlaybackController, SyncReconciler};
use crate::renderer::RendererEvent;
use serde::Deserialize;
use shvid_common::events::AuthoritativeState;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Scenario document
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Initial ownership flag
    #[serde(default)]
    pub owner: bool,
    pub steps: Vec<Step>,
}

/// One scripted action
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// New authoritative snapshot (the first one mounts the renderer)
    State { state: AuthoritativeState },
    /// Error raised on the newest engine's error stream
    EngineError {
        #[serde(default)]
        fatal: bool,
        #[serde(default)]
        kind: EngineErrorKind,
        #[serde(default)]
        details: String,
    },
    /// Callback raised by the renderer
    RendererEvent { event: RendererEvent },
    SetOwner { owner: bool },
    Wait { ms: u64 },
    /// Unmount; a later state step mounts again
    Dispose,
}

impl Scenario {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(content)?;
        if scenario.steps.is_empty() {
            return Err(Error::Scenario("scenario has no steps".to_string()));
        }
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

/// Outcome of a scenario run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub steps_applied: usize,
    /// Engine errors that reached a live subscriber
    pub engine_errors_delivered: usize,
    pub escalations: u64,
}

/// Replays scenarios against a reconciler
pub struct ScenarioRunner<C: PlaybackController> {
    reconciler: SyncReconciler<C>,
    engine: EngineProbe,
    /// Renderer waiting to be mounted (before the first state, after dispose)
    parked: Option<C::Renderer>,
}

impl<C: PlaybackController> ScenarioRunner<C> {
    pub fn new(reconciler: SyncReconciler<C>, engine: EngineProbe, renderer: C::Renderer) -> Self {
        Self {
            reconciler,
            engine,
            parked: Some(renderer),
        }
    }

    pub fn reconciler(&self) -> &SyncReconciler<C> {
        &self.reconciler
    }

    /// Stop the reconciler and hand back the renderer
    pub fn finish(mut self) -> Option<C::Renderer> {
        match self.parked.take() {
            Some(renderer) => Some(renderer),
            None => self.reconciler.dispose(),
        }
    }

    pub async fn run(&mut self, scenario: &Scenario) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        self.reconciler.set_owner(scenario.owner);

        for (index, step) in scenario.steps.iter().enumerate() {
            debug!("Step {}: {:?}", index, step);
            summary.engine_errors_delivered += self.apply_step(index, step).await?;
            self.reconciler.handle_engine_errors();
            summary.steps_applied += 1;
        }

        summary.escalations = self.reconciler.escalation_count();
        info!(
            "Scenario finished: {} steps, {} escalations",
            summary.steps_applied, summary.escalations
        );
        Ok(summary)
    }

    async fn apply_step(&mut self, index: usize, step: &Step) -> Result<usize> {
        match step {
            Step::State { state } => match self.parked.take() {
                Some(renderer) => self.reconciler.initialize(renderer, state.clone()),
                None => self.reconciler.apply(state.clone()),
            },
            Step::EngineError { fatal, kind, details } => {
                let error = EngineError {
                    kind: *kind,
                    fatal: *fatal,
                    details: details.clone(),
                };
                if self.engine.emit_error(error) {
                    return Ok(1);
                }
                debug!("Step {}: engine error had no live subscriber", index);
            }
            Step::RendererEvent { event } => {
                if self.parked.is_some() {
                    return Err(Error::Scenario(format!(
                        "step {}: renderer event {:?} before the renderer is mounted",
                        index, event
                    )));
                }
                self.reconciler.handle_renderer_event(*event);
            }
            Step::SetOwner { owner } => self.reconciler.set_owner(*owner),
            Step::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
            Step::Dispose => {
                if self.parked.is_none() {
                    self.parked = self.reconciler.dispose();
                }
            }
        }
        Ok(0)
    }
}
