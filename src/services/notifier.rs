use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::models::event::{Audience, Envelope, GameEvent};

/// Where the engine sends announcements and private deliveries. Formatting
/// and delivery guarantees belong to the implementation.
pub trait Notifier: Send + Sync {
    fn publish(&self, envelope: Envelope);
}

/// Fans envelopes out to every connected socket; each socket filters by
/// audience.
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Envelope>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn publish(&self, envelope: Envelope) {
        // no subscribers is not an error
        let _ = self.tx.send(envelope);
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    log: Arc<Mutex<Vec<Envelope>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn envelopes(&self) -> Vec<Envelope> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn events_for(&self, audience: &Audience) -> Vec<GameEvent> {
        self.envelopes()
            .into_iter()
            .filter(|e| &e.audience == audience)
            .map(|e| e.event)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, envelope: Envelope) {
        if let Ok(mut log) = self.log.lock() {
            log.push(envelope);
        }
    }
}
