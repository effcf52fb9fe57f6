//! Rolling log of recent system events.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// One logged event. The timestamp is epoch milliseconds and is
/// display-only; engine logic never reads it.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub ts_ms: u64,
    pub message: String,
}

/// Capped ring of recent events, newest first.
#[derive(Debug)]
pub struct HistoryLog {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::new(),
        }
    }

    /// Records a locally generated event, stamped now.
    pub fn push(&mut self, message: impl Into<String>) {
        self.push_at(epoch_ms(), message);
    }

    /// Records an event with a controller-supplied timestamp.
    pub fn push_at(&mut self, ts_ms: u64, message: impl Into<String>) {
        let message = message.into();
        if message.trim().is_empty() {
            return;
        }
        self.entries.push_front(HistoryEntry { ts_ms, message });
        self.entries.truncate(self.capacity);
    }

    /// Replaces the whole log with a controller-supplied list.
    pub fn replace(&mut self, items: impl IntoIterator<Item = HistoryEntry>) {
        self.entries.clear();
        for item in items {
            if self.entries.len() == self.capacity {
                break;
            }
            self.entries.push_back(item);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries newest first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
