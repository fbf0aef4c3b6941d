//! Keyed debouncing of deferred writes
//!
//! Each key holds at most one pending commit. Scheduling again before the
//! quiet period elapses replaces the pending commit (last value wins) and
//! aborts its timer.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type Commit = Box<dyn FnOnce() + Send>;

struct Pending {
    generation: u64,
    commit: Mutex<Commit>,
    timer: Option<JoinHandle<()>>,
}

/// Collapses bursts of writes per key
pub struct Debouncer {
    delay: Duration,
    pending: Arc<DashMap<String, Pending>>,
    generation: AtomicU64,
}

impl Debouncer {
    /// Create debouncer with the given quiet period
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Quiet period
    #[inline]
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `commit` once `key` has been quiet for the delay
    ///
    /// Outside a tokio runtime there is no timer to wait on and the commit
    /// runs immediately.
    pub fn schedule(&self, key: impl Into<String>, commit: impl FnOnce() + Send + 'static) {
        let key = key.into();
        let Ok(handle) = Handle::try_current() else {
            self.cancel(&key);
            commit();
            return;
        };

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let replaced = self.pending.insert(
            key.clone(),
            Pending {
                generation,
                commit: Mutex::new(Box::new(commit)),
                timer: None,
            },
        );
        if let Some(timer) = replaced.and_then(|old| old.timer) {
            timer.abort();
        }

        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        let task_key = key.clone();
        let timer = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let due = pending.remove_if(&task_key, |_, entry| entry.generation == generation);
            if let Some((_, entry)) = due {
                (entry.commit.into_inner())();
            }
        });

        if let Some(mut entry) = self.pending.get_mut(&key) {
            if entry.generation == generation {
                entry.timer = Some(timer);
            }
        }
    }

    /// Drop the pending commit of `key`; returns whether one existed
    pub fn cancel(&self, key: &str) -> bool {
        match self.pending.remove(key) {
            Some((_, entry)) => {
                if let Some(timer) = entry.timer {
                    timer.abort();
                }
                true
            }
            None => false,
        }
    }

    /// Drop every pending commit; returns how many were dropped
    pub fn cancel_all(&self) -> usize {
        let keys: Vec<String> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        keys.iter().filter(|key| self.cancel(key)).count()
    }

    /// Run every pending commit now, in scheduling order
    ///
    /// Returns how many commits ran.
    pub fn flush(&self) -> usize {
        let keys: Vec<String> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        let mut due: Vec<Pending> = keys
            .iter()
            .filter_map(|key| self.pending.remove(key).map(|(_, entry)| entry))
            .collect();
        due.sort_by_key(|entry| entry.generation);

        let count = due.len();
        for entry in due {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
            (entry.commit.into_inner())();
        }
        if count > 0 {
            tracing::debug!(count, "flushed debounced writes");
        }
        count
    }

    /// Number of commits waiting for their quiet period
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.pending_count())
            .finish()
    }
}
