//! Playback synchronization core
//!
//! **Components (leaves first):**
//! - `controller` - imperative commands and read-throughs against one renderer
//! - `session` - lifecycle of one adaptive engine bound to one renderer
//! - `escalator` - the single upward path for fatal failures
//! - `throttle` - rate limiting for outbound time updates
//! - `reconciler` - diffs authoritative state and drives everything above

pub mod controller;
pub mod escalator;
pub mod reconciler;
pub mod session;
pub mod throttle;

pub use controller::{ElementController, PlaybackController};
pub use escalator::ErrorEscalator;
pub use reconciler::SyncReconciler;
pub use session::{Delivery, SessionState, StreamSession};
pub use throttle::{IntervalThrottle, Throttle};

use crate::renderer::MediaRenderer;
use tracing::{debug, warn};

/// Run a release step whose failure must never propagate
///
/// Teardown is best-effort: the failure is logged and discarded so the next
/// step (or the next session) always proceeds.
pub(crate) fn best_effort<E: std::fmt::Display>(step: &str, result: Result<(), E>) {
    if let Err(e) = result {
        warn!("Ignoring failure during {}: {}", step, e);
    }
}

/// Ask the renderer to start playback; a rejection (autoplay policy) is
/// absorbed here and never retried
pub(crate) fn request_playback(renderer: &mut dyn MediaRenderer) {
    if let Err(e) = renderer.play() {
        debug!("Playback start rejected: {}", e);
    }
}

/// Pause, drop the source and reload so the previous resource is released
pub(crate) fn reset_renderer(renderer: &mut dyn MediaRenderer) {
    best_effort("renderer pause", renderer.pause());
    best_effort("renderer source removal", renderer.remove_src());
    best_effort("renderer reload", renderer.load());
}
