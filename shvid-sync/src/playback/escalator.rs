//! Fatal error escalation
//!
//! Every failure that must reach the host goes through [`ErrorEscalator`].
//! Everything else (recoverable engine errors, autoplay rejections, teardown
//! failures) is absorbed where it happens.

use shvid_common::events::{FatalErrorKind, PlayerEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::error;

/// Single upward notification path for fatal failures
#[derive(Debug)]
pub struct ErrorEscalator {
    event_tx: broadcast::Sender<PlayerEvent>,
    escalations_total: AtomicU64,
}

impl ErrorEscalator {
    pub fn new(event_tx: broadcast::Sender<PlayerEvent>) -> Self {
        Self {
            event_tx,
            escalations_total: AtomicU64::new(0),
        }
    }

    /// Report one fatal failure to the host
    pub fn escalate(&self, kind: FatalErrorKind, details: impl Into<String>) {
        let details = details.into();
        error!("Fatal playback failure ({}): {}", kind, details);
        self.escalations_total.fetch_add(1, Ordering::Relaxed);

        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(PlayerEvent::FatalError {
            kind,
            details,
            timestamp: shvid_common::time::now(),
        });
    }

    /// Total escalations since construction
    pub fn escalation_count(&self) -> u64 {
        self.escalations_total.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalate_broadcasts_and_counts() {
        let (tx, mut rx) = broadcast::channel(8);
        let escalator = ErrorEscalator::new(tx);

        escalator.escalate(FatalErrorKind::FatalStream, "network: manifest 404");

        assert_eq!(escalator.escalation_count(), 1);
        match rx.try_recv().unwrap() {
            PlayerEvent::FatalError { kind, details, .. } => {
                assert_eq!(kind, FatalErrorKind::FatalStream);
                assert_eq!(details, "network: manifest 404");
            }
            other => panic!("Expected FatalError, got {:?}", other),
        }
    }

    #[test]
    fn test_escalate_without_receivers() {
        let (tx, rx) = broadcast::channel(8);
        drop(rx);
        let escalator = ErrorEscalator::new(tx);

        escalator.escalate(FatalErrorKind::UnsupportedDelivery, "no engine");
        assert_eq!(escalator.escalation_count(), 1);
    }
}
