//! Test helpers for shvid-sync integration tests
//!
//! Builds a reconciler wired to a simulated renderer and engine, keeping the
//! probes so tests can inspect both after the renderer is handed over.

#![allow(dead_code)]

use shvid_common::events::PlayerEvent;
use shvid_sync::config::SyncConfig;
use shvid_sync::engine::{EngineProbe, SimulatedEngineProvider};
use shvid_sync::playback::{ElementController, SyncReconciler};
use shvid_sync::renderer::{RendererProbe, SimulatedRenderer};
use std::sync::Arc;
use tokio::sync::broadcast;

pub const NATIVE_MIME: &str = "application/vnd.apple.mpegurl";

pub type TestReconciler = SyncReconciler<ElementController<SimulatedRenderer>>;

/// Reconciler plus everything needed to observe it
pub struct Fixture {
    pub reconciler: TestReconciler,
    pub renderer: Option<SimulatedRenderer>,
    pub renderer_probe: RendererProbe,
    pub engine_probe: EngineProbe,
    pub events: broadcast::Receiver<PlayerEvent>,
}

/// Builder for [`Fixture`]
pub struct FixtureBuilder {
    engine_supported: bool,
    native_support: bool,
    owner: bool,
    config: SyncConfig,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        let mut config = SyncConfig::default();
        // Exact seeks unless a test opts in to suppression
        config.sync.seek_tolerance_secs = 0.0;
        Self {
            engine_supported: true,
            native_support: false,
            owner: false,
            config,
        }
    }

    pub fn engine_supported(mut self, supported: bool) -> Self {
        self.engine_supported = supported;
        self
    }

    pub fn native_support(mut self, supported: bool) -> Self {
        self.native_support = supported;
        self
    }

    pub fn owner(mut self, owner: bool) -> Self {
        self.owner = owner;
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Fixture {
        let (renderer, renderer_probe) = if self.native_support {
            SimulatedRenderer::with_native_support(NATIVE_MIME)
        } else {
            SimulatedRenderer::new()
        };
        let (engines, engine_probe) = SimulatedEngineProvider::new(self.engine_supported);
        let reconciler =
            SyncReconciler::new(ElementController::new(), Arc::new(engines), self.config)
                .with_owner(self.owner);
        let events = reconciler.subscribe_events();

        Fixture {
            reconciler,
            renderer: Some(renderer),
            renderer_probe,
            engine_probe,
            events,
        }
    }
}

impl Fixture {
    /// Mount the renderer with an initial state
    pub fn mount(&mut self, state: shvid_common::AuthoritativeState) {
        let renderer = self
            .renderer
            .take()
            .expect("renderer already mounted");
        self.reconciler.initialize(renderer, state);
    }

    /// Drain every event received so far
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Number of FatalError events received so far (drains the receiver)
    pub fn fatal_error_count(&mut self) -> usize {
        self.drain_events()
            .iter()
            .filter(|e| matches!(e, PlayerEvent::FatalError { .. }))
            .count()
    }
}
