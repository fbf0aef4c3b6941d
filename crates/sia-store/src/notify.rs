//! Change notification
//!
//! Every value change accepted by the coordinator is announced once on the
//! [`ChangeBus`]. Synchronous listeners run under an [`UpdateGuard`]: a
//! change emitted from inside a listener is dropped instead of recursing,
//! a change emitted from another thread waits for the running broadcast,
//! and a panicking listener is logged without stopping the others. Async
//! consumers can take a [`tokio::sync::broadcast`] receiver instead.

use crate::guard::UpdateGuard;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// One accepted field change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Concrete flat key written
    pub key: String,
    /// New value
    pub value: Value,
    /// Section the change was made from, if any
    pub section: Option<String>,
}

/// Synchronous change listener
pub type Listener = Arc<dyn Fn(&FieldChange) + Send + Sync>;

/// Handle returned by [`ChangeBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fan-out of field changes to listeners
pub struct ChangeBus {
    guard: UpdateGuard,
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<FieldChange>,
}

impl ChangeBus {
    /// Create bus without listeners
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            guard: UpdateGuard::new(),
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            sender,
        }
    }

    /// Register a synchronous listener
    pub fn subscribe(
        &self,
        listener: impl Fn(&FieldChange) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Receiver of every change broadcast from now on
    #[must_use]
    pub fn subscribe_stream(&self) -> broadcast::Receiver<FieldChange> {
        self.sender.subscribe()
    }

    /// Number of synchronous listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// True while listeners are being called
    #[inline]
    #[must_use]
    pub fn is_broadcasting(&self) -> bool {
        self.guard.is_busy()
    }

    /// Deliver `change` to every listener and stream subscriber
    ///
    /// Returns `false` when the change was suppressed because it was
    /// emitted from inside a listener on this thread. Emits from other
    /// threads block until the running broadcast is done.
    pub fn emit(&self, change: FieldChange) -> bool {
        let listeners: Vec<(SubscriptionId, Listener)> = self.listeners.read().clone();

        let delivered = self.guard.run_exclusive(|| {
            for (id, listener) in &listeners {
                if catch_unwind(AssertUnwindSafe(|| listener(&change))).is_err() {
                    tracing::warn!(key = %change.key, listener = id.0, "change listener panicked");
                }
            }
            // No stream subscribers is not an error.
            let _ = self.sender.send(change.clone());
        });

        if delivered.is_none() {
            tracing::debug!(key = %change.key, "re-entrant change suppressed");
        }
        delivered.is_some()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus")
            .field("listeners", &self.listener_count())
            .field("broadcasting", &self.is_broadcasting())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn change(key: &str) -> FieldChange {
        FieldChange {
            key: key.to_string(),
            value: json!("x"),
            section: None,
        }
    }

    #[test]
    fn listeners_receive_changes() {
        let bus = ChangeBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(move |c| sink.lock().push(c.key.clone()));

        assert!(bus.emit(change("a")));
        assert!(bus.emit(change("b")));
        assert_eq!(*seen.lock(), vec!["a", "b"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = ChangeBus::new();
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let id = bus.subscribe(move |_| *sink.lock() += 1);

        bus.emit(change("a"));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(change("b"));
        assert_eq!(*seen.lock(), 1);
    }

    #[tokio::test]
    async fn stream_subscribers_get_changes() {
        let bus = ChangeBus::new();
        let mut rx = bus.subscribe_stream();
        bus.emit(change("grupoAISD_A1"));
        assert_eq!(rx.recv().await.unwrap().key, "grupoAISD_A1");
    }
}
