//! Shared "latest detection" state.
//!
//! [`CorrelationState`] has a single writer (the poll loop) and any number of
//! readers. The snapshot is an immutable [`CorrelationSnapshot`] behind an
//! `Arc`; publishing swaps the whole `Arc`, so a reader either sees the
//! previous cycle's record or the new one, never a mix of both.
//!
//! Feed connectivity lives beside the snapshot rather than inside it: a
//! camera outage updates [`FeedStatus`] and leaves the last good detection
//! untouched.

use crate::types::{AppointmentOutcome, DetectionRecord};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};

/// One complete correlation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationSnapshot {
    pub plate: Option<String>,
    pub detected_at: Option<DateTime<FixedOffset>>,
    /// `None` until the first correlation completes.
    pub outcome: Option<AppointmentOutcome>,
    pub last_updated_at: DateTime<Utc>,
}

impl CorrelationSnapshot {
    pub fn pending() -> Self {
        Self {
            plate: None,
            detected_at: None,
            outcome: None,
            last_updated_at: Utc::now(),
        }
    }

    pub fn correlated(record: &DetectionRecord, outcome: AppointmentOutcome) -> Self {
        Self {
            plate: Some(record.plate().to_string()),
            detected_at: Some(record.captured_at()),
            outcome: Some(outcome),
            last_updated_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.outcome.is_none()
    }
}

/// Last-known reachability of the camera feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedStatus {
    pub connected: bool,
    pub message: String,
    /// Number of records in the last successful fetch.
    pub recent_events: usize,
    pub checked_at: Option<DateTime<Utc>>,
}

impl FeedStatus {
    pub fn unknown() -> Self {
        Self {
            connected: false,
            message: "Cámara aún no consultada".to_string(),
            recent_events: 0,
            checked_at: None,
        }
    }

    pub fn up(recent_events: usize) -> Self {
        Self {
            connected: true,
            message: "Conexión exitosa con la cámara".to_string(),
            recent_events,
            checked_at: Some(Utc::now()),
        }
    }

    pub fn down(message: impl Into<String>) -> Self {
        Self {
            connected: false,
            message: message.into(),
            recent_events: 0,
            checked_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug)]
pub struct CorrelationState {
    snapshot: RwLock<Arc<CorrelationSnapshot>>,
    feed: RwLock<FeedStatus>,
}

impl Default for CorrelationState {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationState {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(CorrelationSnapshot::pending())),
            feed: RwLock::new(FeedStatus::unknown()),
        }
    }

    /// Current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<CorrelationSnapshot> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the snapshot in one step.
    pub fn publish(&self, snapshot: CorrelationSnapshot) {
        let next = Arc::new(snapshot);
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }

    pub fn feed_status(&self) -> FeedStatus {
        self.feed.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_feed_status(&self, status: FeedStatus) {
        let mut guard = self.feed.write().unwrap_or_else(PoisonError::into_inner);
        if guard.connected != status.connected {
            tracing::info!(connected = status.connected, message = %status.message, "camera connectivity changed");
        }
        *guard = status;
    }
}
