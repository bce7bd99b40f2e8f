//! Exact-match duplicate suppression for detection events.
//!
//! The deduplicator is owned by the poll loop and mutated only from its task,
//! so it needs no locking. Without a retention window the processed set grows
//! for the lifetime of the process. With one, keys captured before
//! `newest_seen - retention` are evicted. `is_new` is decided by key
//! membership alone, so a camera clock that steps backwards never hides a
//! vehicle that was not processed.

use crate::types::{DetectionRecord, EventKey};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct EventDeduplicator {
    processed: HashMap<EventKey, DateTime<Utc>>,
    retention: Option<Duration>,
    newest: Option<DateTime<Utc>>,
}

impl EventDeduplicator {
    /// Unbounded deduplicator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deduplicator that only remembers keys within `retention` of the newest
    /// processed capture.
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            retention: Some(retention),
            ..Self::default()
        }
    }

    pub fn is_new(&self, record: &DetectionRecord) -> bool {
        !self.processed.contains_key(&record.event_key())
    }

    pub fn mark_processed(&mut self, record: &DetectionRecord) {
        let captured = record.captured_at().with_timezone(&Utc);
        self.processed.insert(record.event_key(), captured);
        if self.newest.map_or(true, |n| captured > n) {
            self.newest = Some(captured);
        }
        self.evict();
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    /// `None` when unbounded, nothing is marked yet, or the subtraction
    /// falls outside chrono's range.
    fn horizon(&self) -> Option<DateTime<Utc>> {
        self.newest?.checked_sub_signed(self.retention?)
    }

    fn evict(&mut self) {
        if let Some(horizon) = self.horizon() {
            let before = self.processed.len();
            self.processed.retain(|_, captured| *captured >= horizon);
            let evicted = before - self.processed.len();
            if evicted > 0 {
                tracing::debug!(evicted, remaining = self.processed.len(), "dedup keys evicted");
            }
        }
    }
}
