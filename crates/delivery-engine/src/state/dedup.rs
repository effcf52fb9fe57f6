//! Duplicate suppression for the at-least-once event feed.

use delivery_wire::OrderEventKind;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Remembers the last *accepted* event per entity key and drops identical
/// re-deliveries inside the suppression window.
///
/// Only accepted events refresh the window; a dropped duplicate does not
/// extend it. Reset is the one path that bypasses the gate entirely.
#[derive(Debug)]
pub struct DedupGate {
    window: Duration,
    last_accepted: HashMap<String, (OrderEventKind, Instant)>,
}

impl DedupGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    /// Returns `true` when the event should be processed. Updates the cache
    /// entry for the key on acceptance.
    pub fn admit(&mut self, kind: OrderEventKind, key: &str, now: Instant) -> bool {
        if let Some((last_kind, at)) = self.last_accepted.get(key) {
            if *last_kind == kind && now.duration_since(*at) < self.window {
                return false;
            }
        }
        self.last_accepted.insert(key.to_string(), (kind, now));
        true
    }

    /// Drops the cache entry for a purged order.
    pub fn forget(&mut self, key: &str) {
        self.last_accepted.remove(key);
    }

    pub fn clear(&mut self) {
        self.last_accepted.clear();
    }
}
