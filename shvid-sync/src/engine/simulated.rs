//! In-memory adaptive engine
//!
//! Stands in for a real HLS client. Every engine created by a
//! [`SimulatedEngineProvider`] writes to one shared log, and an
//! [`EngineProbe`] on the same log can inject errors into the error streams
//! of engines (including ones already destroyed, to model late callbacks).

use super::{AdaptiveEngine, EngineError, EngineErrorKind, EngineOptions, EngineProvider};
use crate::renderer::MediaRenderer;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::trace;

/// One recorded engine call
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Created { id: usize, options: EngineOptions },
    Subscribed(usize),
    Load { id: usize, url: String },
    Attach(usize),
    Destroy(usize),
}

#[derive(Debug, Default)]
struct EngineLog {
    next_id: usize,
    calls: Vec<EngineCall>,
    subscribers: Vec<(usize, mpsc::UnboundedSender<EngineError>)>,
    destroyed: Vec<usize>,
    fail_load: bool,
    fail_attach: bool,
    fail_destroy: bool,
}

fn lock(log: &Mutex<EngineLog>) -> MutexGuard<'_, EngineLog> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Engine factory with a switchable capability flag
#[derive(Debug)]
pub struct SimulatedEngineProvider {
    supported: bool,
    log: Arc<Mutex<EngineLog>>,
}

/// Inspection and fault-injection handle shared with a provider
#[derive(Debug, Clone)]
pub struct EngineProbe {
    log: Arc<Mutex<EngineLog>>,
}

struct SimulatedEngine {
    id: usize,
    log: Arc<Mutex<EngineLog>>,
}

impl SimulatedEngineProvider {
    pub fn new(supported: bool) -> (Self, EngineProbe) {
        let log = Arc::new(Mutex::new(EngineLog::default()));
        (
            Self {
                supported,
                log: Arc::clone(&log),
            },
            EngineProbe { log },
        )
    }
}

impl EngineProvider for SimulatedEngineProvider {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, options: EngineOptions) -> Box<dyn AdaptiveEngine> {
        let mut log = lock(&self.log);
        let id = log.next_id;
        log.next_id += 1;
        log.calls.push(EngineCall::Created { id, options });
        trace!("Simulated engine {} created", id);
        Box::new(SimulatedEngine {
            id,
            log: Arc::clone(&self.log),
        })
    }
}

impl AdaptiveEngine for SimulatedEngine {
    fn subscribe_errors(&mut self) -> mpsc::UnboundedReceiver<EngineError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut log = lock(&self.log);
        log.calls.push(EngineCall::Subscribed(self.id));
        log.subscribers.push((self.id, tx));
        rx
    }

    fn load_source(&mut self, url: &str) -> Result<(), EngineError> {
        let mut log = lock(&self.log);
        log.calls.push(EngineCall::Load {
            id: self.id,
            url: url.to_string(),
        });
        if log.fail_load {
            return Err(EngineError::fatal(
                EngineErrorKind::Network,
                format!("manifest load failed: {}", url),
            ));
        }
        Ok(())
    }

    fn attach_media(&mut self, _renderer: &mut dyn MediaRenderer) -> Result<(), EngineError> {
        let mut log = lock(&self.log);
        log.calls.push(EngineCall::Attach(self.id));
        if log.fail_attach {
            return Err(EngineError::fatal(
                EngineErrorKind::Media,
                "media source attach failed",
            ));
        }
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), EngineError> {
        let mut log = lock(&self.log);
        if log.destroyed.contains(&self.id) {
            return Ok(());
        }
        log.calls.push(EngineCall::Destroy(self.id));
        log.destroyed.push(self.id);
        if log.fail_destroy {
            return Err(EngineError::fatal(EngineErrorKind::Other, "destroy threw"));
        }
        Ok(())
    }
}

impl EngineProbe {
    /// Send an error on the newest engine's error stream
    ///
    /// Returns true when a live subscriber received it.
    pub fn emit_error(&self, error: EngineError) -> bool {
        let latest = lock(&self.log).next_id.checked_sub(1);
        match latest {
            Some(id) => self.emit_error_to(id, error),
            None => false,
        }
    }

    /// Send an error on a specific engine's error stream
    ///
    /// Returns false when nobody is subscribed any more. Subscriptions whose
    /// receiver is gone are pruned on the way.
    pub fn emit_error_to(&self, id: usize, error: EngineError) -> bool {
        let mut log = lock(&self.log);
        log.subscribers.retain(|(_, tx)| !tx.is_closed());
        let mut delivered = false;
        for (_, tx) in log.subscribers.iter().filter(|(sub_id, _)| *sub_id == id) {
            if tx.send(error.clone()).is_ok() {
                delivered = true;
            }
        }
        delivered
    }

    /// Error subscriptions still held open by a receiver
    pub fn open_subscriptions(&self) -> usize {
        lock(&self.log)
            .subscribers
            .iter()
            .filter(|(_, tx)| !tx.is_closed())
            .count()
    }

    /// Forget recorded calls (engine ids and fault flags are kept)
    pub fn clear_calls(&self) {
        lock(&self.log).calls.clear();
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.log).calls.clone()
    }

    /// Engines created so far
    pub fn created(&self) -> usize {
        lock(&self.log).next_id
    }

    /// Engines created and not yet destroyed
    pub fn live(&self) -> usize {
        let log = lock(&self.log);
        log.next_id - log.destroyed.len()
    }

    pub fn latest_engine_id(&self) -> Option<usize> {
        lock(&self.log).next_id.checked_sub(1)
    }

    pub fn set_fail_load(&self, fail: bool) {
        lock(&self.log).fail_load = fail;
    }

    pub fn set_fail_attach(&self, fail: bool) {
        lock(&self.log).fail_attach = fail;
    }

    pub fn set_fail_destroy(&self, fail: bool) {
        lock(&self.log).fail_destroy = fail;
    }
}
