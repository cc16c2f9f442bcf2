//! Reconciliation behaviour against simulated back ends
//!
//! Covers source setup across the three delivery tiers, the idempotence
//! guard, destroy-before-create ordering, fatal error escalation and
//! per-field minimality of state reconciliation.

mod helpers;

use helpers::FixtureBuilder;
use shvid_common::events::{AuthoritativeState, FatalErrorKind, PlaybackStatus, PlayerEvent};
use shvid_sync::engine::{EngineCall, EngineError, EngineErrorKind};
use shvid_sync::playback::{Delivery, SessionState};
use shvid_sync::renderer::{RendererCall, SimulatedRenderer};
use std::time::Duration;

const MANIFEST: &str = "https://cdn.example.com/live/a.m3u8";
const OTHER_MANIFEST: &str = "https://cdn.example.com/live/b.m3u8";

// ============================================================================
// Source setup
// ============================================================================

#[test]
fn test_mount_adaptive_with_engine() {
    let mut fixture = FixtureBuilder::new().build();

    fixture.mount(AuthoritativeState::new("a.m3u8"));

    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Attached));
    assert_eq!(
        fixture.reconciler.session().unwrap().delivery(),
        Some(Delivery::Engine)
    );
    assert_eq!(
        fixture
            .renderer_probe
            .count(|c| matches!(c, RendererCall::SetSrc(_))),
        0,
        "renderer source must never be set directly when the engine is used"
    );
    assert_eq!(fixture.renderer_probe.count(|c| *c == RendererCall::Play), 1);
    assert_eq!(fixture.engine_probe.created(), 1);
}

#[test]
fn test_mount_direct_source() {
    let mut fixture = FixtureBuilder::new().build();

    fixture.mount(AuthoritativeState::new("clip.mp4"));

    assert_eq!(fixture.renderer_probe.snapshot().src.as_deref(), Some("clip.mp4"));
    assert!(fixture.reconciler.session().is_none());
    assert_eq!(fixture.engine_probe.created(), 0);
    assert_eq!(fixture.renderer_probe.count(|c| *c == RendererCall::Play), 1);
}

#[test]
fn test_mount_adaptive_native_fallback() {
    let mut fixture = FixtureBuilder::new()
        .engine_supported(false)
        .native_support(true)
        .build();

    fixture.mount(AuthoritativeState::new(MANIFEST));

    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Attached));
    assert_eq!(
        fixture.reconciler.session().unwrap().delivery(),
        Some(Delivery::Native)
    );
    assert_eq!(fixture.renderer_probe.snapshot().src.as_deref(), Some(MANIFEST));
    assert_eq!(fixture.engine_probe.created(), 0);
}

#[test]
fn test_mount_adaptive_unsupported() {
    let mut fixture = FixtureBuilder::new()
        .engine_supported(false)
        .native_support(false)
        .build();

    fixture.mount(AuthoritativeState::new(MANIFEST));

    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Error));
    assert_eq!(fixture.renderer_probe.count(|c| *c == RendererCall::Play), 0);

    let events = fixture.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        PlayerEvent::FatalError { kind: FatalErrorKind::UnsupportedDelivery, .. }
    ));
}

#[test]
fn test_autoplay_rejection_never_escalated() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.renderer_probe.set_reject_play(true);

    fixture.mount(AuthoritativeState::new("clip.mp4"));
    fixture
        .reconciler
        .apply(AuthoritativeState::new("clip.mp4").with_status(PlaybackStatus::Playing));

    assert_eq!(fixture.renderer_probe.count(|c| *c == RendererCall::Play), 2);
    assert_eq!(fixture.fatal_error_count(), 0);
}

#[test]
fn test_reset_failures_do_not_block_setup() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));
    fixture.renderer_probe.set_fail_release(true);
    fixture.engine_probe.set_fail_destroy(true);

    fixture.reconciler.apply(AuthoritativeState::new(OTHER_MANIFEST));

    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Attached));
    assert_eq!(fixture.engine_probe.created(), 2);
    assert_eq!(fixture.engine_probe.live(), 1);
    assert_eq!(fixture.fatal_error_count(), 0);
}

// ============================================================================
// Idempotence and destroy-before-create
// ============================================================================

#[test]
fn test_same_source_twice_is_noop() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::default());

    fixture.reconciler.setup_source(Some(MANIFEST));
    fixture.renderer_probe.clear_calls();
    let engine_calls = fixture.engine_probe.calls().len();

    fixture.reconciler.setup_source(Some(MANIFEST));

    assert_eq!(fixture.engine_probe.created(), 1);
    assert_eq!(fixture.engine_probe.calls().len(), engine_calls);
    assert!(fixture.renderer_probe.calls().is_empty());
}

#[test]
fn test_empty_source_is_noop() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));
    fixture.renderer_probe.clear_calls();

    fixture.reconciler.setup_source(Some(""));
    fixture.reconciler.setup_source(None);
    fixture.reconciler.apply(AuthoritativeState::default());

    assert!(fixture.renderer_probe.calls().is_empty());
    assert_eq!(fixture.engine_probe.live(), 1);
    assert_eq!(fixture.reconciler.last_applied_source(), Some(MANIFEST));
}

#[test]
fn test_previous_session_destroyed_before_next_created() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));

    fixture.reconciler.apply(AuthoritativeState::new(OTHER_MANIFEST));

    let calls = fixture.engine_probe.calls();
    let destroyed_first = calls
        .iter()
        .position(|c| *c == EngineCall::Destroy(0))
        .expect("first engine destroyed");
    let created_second = calls
        .iter()
        .position(|c| matches!(c, EngineCall::Created { id: 1, .. }))
        .expect("second engine created");
    assert!(destroyed_first < created_second);
    assert_eq!(fixture.engine_probe.live(), 1);
    assert_eq!(fixture.reconciler.last_applied_source(), Some(OTHER_MANIFEST));
}

#[test]
fn test_late_errors_from_replaced_session_ignored() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));
    fixture.reconciler.apply(AuthoritativeState::new(OTHER_MANIFEST));

    let delivered = fixture
        .engine_probe
        .emit_error_to(0, EngineError::fatal(EngineErrorKind::Network, "late"));

    assert!(!delivered);
    assert_eq!(fixture.reconciler.handle_engine_errors(), 0);
    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Attached));
    assert_eq!(fixture.fatal_error_count(), 0);
}

#[test]
fn test_switch_to_direct_releases_engine() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));

    fixture.reconciler.apply(AuthoritativeState::new("clip.mp4"));

    assert!(fixture.reconciler.session().is_none());
    assert_eq!(fixture.engine_probe.live(), 0);
    assert_eq!(fixture.renderer_probe.snapshot().src.as_deref(), Some("clip.mp4"));
}

// ============================================================================
// Error escalation
// ============================================================================

#[test]
fn test_single_fatal_error_escalated_once() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));

    fixture
        .engine_probe
        .emit_error(EngineError::fatal(EngineErrorKind::Network, "manifest 404"));
    fixture.reconciler.handle_engine_errors();
    fixture.reconciler.handle_engine_errors();

    assert_eq!(fixture.fatal_error_count(), 1);
    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Error));
    assert_eq!(fixture.engine_probe.live(), 0);
}

#[test]
fn test_non_fatal_burst_not_escalated() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));

    for i in 0..25 {
        fixture.engine_probe.emit_error(EngineError::recoverable(
            EngineErrorKind::Media,
            format!("fragment parsing error {}", i),
        ));
    }

    assert_eq!(fixture.reconciler.handle_engine_errors(), 0);
    assert_eq!(fixture.fatal_error_count(), 0);
    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Attached));
}

#[test]
fn test_redelivered_source_after_fatal_error_is_noop() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));
    fixture
        .engine_probe
        .emit_error(EngineError::fatal(EngineErrorKind::Media, "decode failure"));
    fixture.reconciler.handle_engine_errors();

    fixture.reconciler.apply(AuthoritativeState::new(MANIFEST));

    // No automatic restart; only a different source rebuilds the session
    assert_eq!(fixture.engine_probe.created(), 1);
    fixture.reconciler.apply(AuthoritativeState::new(OTHER_MANIFEST));
    assert_eq!(fixture.engine_probe.created(), 2);
    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Attached));
}

#[test]
fn test_pending_fatal_error_escalated_before_source_switch() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));
    assert!(fixture
        .engine_probe
        .emit_error(EngineError::fatal(EngineErrorKind::Network, "manifest 404")));

    // Host never drains explicitly; the switch must not swallow the error
    fixture.reconciler.apply(AuthoritativeState::new(OTHER_MANIFEST));
    fixture.reconciler.handle_engine_errors();

    assert_eq!(fixture.fatal_error_count(), 1);
    assert_eq!(fixture.engine_probe.created(), 2);
    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Attached));
}

#[test]
fn test_pending_fatal_error_escalated_on_field_change() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));
    fixture
        .engine_probe
        .emit_error(EngineError::fatal(EngineErrorKind::Media, "decode failure"));

    fixture.reconciler.apply(AuthoritativeState::new(MANIFEST).with_status(PlaybackStatus::Playing));
    fixture.reconciler.apply(
        AuthoritativeState::new(MANIFEST)
            .with_status(PlaybackStatus::Playing)
            .with_muted(true),
    );

    assert_eq!(fixture.fatal_error_count(), 1);
    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Error));
}

#[test]
fn test_pending_fatal_error_escalated_on_dispose() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));
    fixture
        .engine_probe
        .emit_error(EngineError::fatal(EngineErrorKind::Network, "gone"));

    assert!(fixture.reconciler.dispose().is_some());
    assert_eq!(fixture.fatal_error_count(), 1);
}

#[tokio::test]
async fn test_next_engine_error_escalates_as_errors_arrive() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));
    let engine = fixture.engine_probe.clone();

    let emitter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.emit_error(EngineError::fatal(EngineErrorKind::Network, "timeout"))
    });

    let escalations = tokio::time::timeout(
        Duration::from_secs(2),
        fixture.reconciler.next_engine_error(),
    )
    .await
    .expect("fatal error should arrive");

    assert!(emitter.await.unwrap());
    assert_eq!(escalations, 1);
    assert_eq!(fixture.fatal_error_count(), 1);
}

#[tokio::test]
async fn test_next_engine_error_pends_without_session() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new("clip.mp4"));

    let waited = tokio::time::timeout(
        Duration::from_millis(20),
        fixture.reconciler.next_engine_error(),
    )
    .await;

    assert!(waited.is_err());
}

// ============================================================================
// Field-level reconciliation
// ============================================================================

#[test]
fn test_muted_only_change_is_minimal() {
    let mut fixture = FixtureBuilder::new().build();
    let state = AuthoritativeState::new(MANIFEST)
        .with_time(10.0)
        .with_status(PlaybackStatus::Playing);
    fixture.mount(state.clone());
    fixture.renderer_probe.clear_calls();
    let engine_calls = fixture.engine_probe.calls().len();

    fixture.reconciler.reconcile(&state, &state.clone().with_muted(true));

    assert_eq!(fixture.renderer_probe.calls(), vec![RendererCall::SetMuted(true)]);
    assert_eq!(fixture.engine_probe.calls().len(), engine_calls);

    fixture.renderer_probe.clear_calls();
    fixture
        .reconciler
        .reconcile(&state.clone().with_muted(true), &state);
    assert_eq!(fixture.renderer_probe.calls(), vec![RendererCall::SetMuted(false)]);
}

#[test]
fn test_status_flip_pauses_once() {
    let mut fixture = FixtureBuilder::new().build();
    let playing = AuthoritativeState::new(MANIFEST).with_status(PlaybackStatus::Playing);
    fixture.mount(playing.clone());
    fixture.renderer_probe.clear_calls();

    fixture
        .reconciler
        .apply(playing.clone().with_status(PlaybackStatus::Paused));

    assert_eq!(fixture.renderer_probe.calls(), vec![RendererCall::Pause]);
    assert_eq!(fixture.engine_probe.created(), 1);
    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Attached));
}

#[test]
fn test_time_change_seeks() {
    let mut fixture = FixtureBuilder::new().build();
    let state = AuthoritativeState::new("clip.mp4").with_time(5.0);
    fixture.mount(state.clone());
    fixture.renderer_probe.clear_calls();

    fixture.reconciler.apply(state.clone().with_time(93.25));

    assert_eq!(fixture.renderer_probe.calls(), vec![RendererCall::Seek(93.25)]);
}

#[test]
fn test_simultaneous_changes_applied_in_one_pass() {
    let mut fixture = FixtureBuilder::new().build();
    let before = AuthoritativeState::new("clip.mp4");
    fixture.mount(before.clone());
    fixture.renderer_probe.clear_calls();

    let after = AuthoritativeState::new(MANIFEST)
        .with_time(30.0)
        .with_status(PlaybackStatus::Playing)
        .with_muted(true);
    fixture.reconciler.reconcile(&before, &after);

    let calls = fixture.renderer_probe.calls();
    assert!(calls.contains(&RendererCall::Seek(30.0)));
    assert!(calls.contains(&RendererCall::SetMuted(true)));
    assert_eq!(fixture.engine_probe.created(), 1);
    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Attached));
    // Source setup runs before the seek
    let reload = calls.iter().position(|c| *c == RendererCall::Load).unwrap();
    let seek = calls.iter().position(|c| *c == RendererCall::Seek(30.0)).unwrap();
    assert!(reload < seek);
}

#[test]
fn test_unchanged_snapshot_does_nothing() {
    let mut fixture = FixtureBuilder::new().build();
    let state = AuthoritativeState::new(MANIFEST)
        .with_time(12.0)
        .with_status(PlaybackStatus::Playing)
        .with_muted(true);
    fixture.mount(state.clone());
    fixture.renderer_probe.clear_calls();

    fixture.reconciler.apply(state.clone());
    fixture.reconciler.reconcile(&state, &state);

    assert!(fixture.renderer_probe.calls().is_empty());
    assert_eq!(fixture.engine_probe.created(), 1);
}

#[test]
fn test_ownership_does_not_change_reconciliation() {
    for owner in [false, true] {
        let mut fixture = FixtureBuilder::new().owner(owner).build();
        let state = AuthoritativeState::new("clip.mp4");
        fixture.mount(state.clone());
        fixture.renderer_probe.clear_calls();

        fixture.reconciler.apply(
            state
                .clone()
                .with_time(8.0)
                .with_status(PlaybackStatus::Playing)
                .with_muted(true),
        );

        assert_eq!(
            fixture.renderer_probe.calls(),
            vec![
                RendererCall::Seek(8.0),
                RendererCall::Play,
                RendererCall::SetMuted(true),
            ],
            "owner = {}",
            owner
        );
    }
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_initialize_replaces_attached_renderer() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new("clip.mp4"));
    let (replacement, replacement_probe) = SimulatedRenderer::new();

    fixture
        .reconciler
        .initialize(replacement, AuthoritativeState::new("clip.mp4"));

    // Old renderer released, new renderer bound to the same source
    assert_eq!(fixture.renderer_probe.snapshot().src, None);
    assert_eq!(replacement_probe.snapshot().src.as_deref(), Some("clip.mp4"));
    assert_eq!(fixture.reconciler.last_applied_source(), Some("clip.mp4"));
}

#[test]
fn test_initialize_replacing_renderer_rebuilds_session() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));
    let (replacement, _replacement_probe) = SimulatedRenderer::new();

    fixture
        .reconciler
        .initialize(replacement, AuthoritativeState::new(MANIFEST));

    assert_eq!(fixture.engine_probe.created(), 2);
    assert_eq!(fixture.engine_probe.live(), 1);
    assert_eq!(fixture.reconciler.session_state(), Some(SessionState::Attached));
}

#[test]
fn test_dispose_releases_everything() {
    let mut fixture = FixtureBuilder::new().build();
    fixture.mount(AuthoritativeState::new(MANIFEST));

    let renderer = fixture.reconciler.dispose();

    assert!(renderer.is_some());
    assert_eq!(fixture.engine_probe.live(), 0);
    assert!(fixture.reconciler.session().is_none());
    assert_eq!(fixture.reconciler.handle_engine_errors(), 0);

    // Commands after dispose are no-ops
    fixture
        .reconciler
        .apply(AuthoritativeState::new(OTHER_MANIFEST).with_muted(true));
    assert_eq!(fixture.engine_probe.created(), 1);
}
