use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::signals::DetectionSignal;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    value: bool,
    computed_at: Instant,
}

/// TTL memo for slow-changing signals.
///
/// The lock is held only around entry reads and writes, never across
/// `compute`. Two racing callers may both recompute; the later write wins.
pub struct EnvironmentCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<DetectionSignal, CacheEntry>>,
}

impl EnvironmentCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_compute(&self, kind: DetectionSignal, compute: impl FnOnce() -> bool) -> bool {
        let now = self.clock.now();
        if let Some(value) = self.fresh_value(kind, now) {
            return value;
        }

        let value = compute();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                kind,
                CacheEntry {
                    value,
                    computed_at: now,
                },
            );
        value
    }

    /// Cached value for `kind` if it has not yet expired.
    pub fn peek(&self, kind: DetectionSignal) -> Option<bool> {
        self.fresh_value(kind, self.clock.now())
    }

    pub fn invalidate(&self, kind: DetectionSignal) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
    }

    fn fresh_value(&self, kind: DetectionSignal, now: Instant) -> Option<bool> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&kind)?;
        if now.saturating_duration_since(entry.computed_at) < self.ttl {
            Some(entry.value)
        } else {
            None
        }
    }
}
