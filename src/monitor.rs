//! The poll loop: fetch, deduplicate, archive, resolve, publish.
//!
//! A single task owns the [`PollLoop`] and runs one cycle per tick. Only the
//! newest record of each fetch is considered; older records in the same
//! response are never backfilled.

use futures::FutureExt;
use lpr_core::{
    AppointmentOutcome, CorrelationSnapshot, CorrelationState, DetectionRecord,
    EventDeduplicator, EventKey, FeedStatus,
};
use lpr_feeds::{connection_status, AppointmentResolver, Archiver, DetectionFeed, NoArchiver};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// What one cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleReport {
    /// The fetch failed; carries the error text.
    FeedUnavailable(String),
    /// The feed answered with no usable records.
    Empty,
    /// The newest record was already processed.
    Duplicate(EventKey),
    /// A new record was correlated and published.
    Correlated {
        key: EventKey,
        outcome: AppointmentOutcome,
    },
}

pub struct PollLoop<F, R, A = NoArchiver> {
    feed: F,
    resolver: R,
    archiver: Arc<A>,
    state: Arc<CorrelationState>,
    dedup: EventDeduplicator,
    poll_interval: Duration,
    resolve_timeout: Duration,
}

impl<F, R> PollLoop<F, R, NoArchiver>
where
    F: DetectionFeed,
    R: AppointmentResolver,
{
    pub fn new(feed: F, resolver: R, state: Arc<CorrelationState>) -> Self {
        Self {
            feed,
            resolver,
            archiver: Arc::new(NoArchiver),
            state,
            dedup: EventDeduplicator::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl<F, R, A> PollLoop<F, R, A>
where
    F: DetectionFeed,
    R: AppointmentResolver,
    A: Archiver,
{
    pub fn with_archiver<B: Archiver>(self, archiver: B) -> PollLoop<F, R, B> {
        PollLoop {
            feed: self.feed,
            resolver: self.resolver,
            archiver: Arc::new(archiver),
            state: self.state,
            dedup: self.dedup,
            poll_interval: self.poll_interval,
            resolve_timeout: self.resolve_timeout,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Upper bound on one appointment lookup. Exceeding it records
    /// `LookupFailed` for the detection.
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_dedup(mut self, dedup: EventDeduplicator) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn state(&self) -> &Arc<CorrelationState> {
        &self.state
    }

    /// Check the camera once before polling starts and seed the published
    /// connectivity with the result.
    pub async fn verify_connection(&self) -> FeedStatus {
        let status = self.feed.check_connection().await;
        if status.connected {
            tracing::info!(recent_events = status.recent_events, "camera reachable");
        } else {
            tracing::warn!(message = %status.message, "camera not reachable at startup; polling anyway");
        }
        self.state.set_feed_status(status.clone());
        status
    }

    /// Run cycles forever at the configured interval.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = self.poll_interval.as_millis() as u64, "poll loop started");

        loop {
            ticker.tick().await;
            self.guarded_cycle().await;
        }
    }

    /// One cycle with panics contained. Returns `None` if the cycle panicked.
    pub async fn guarded_cycle(&mut self) -> Option<CycleReport> {
        match AssertUnwindSafe(self.poll_once()).catch_unwind().await {
            Ok(report) => Some(report),
            Err(panic) => {
                let msg = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(panic = %msg, "poll cycle panicked; continuing");
                None
            }
        }
    }

    /// Run exactly one cycle.
    pub async fn poll_once(&mut self) -> CycleReport {
        let fetched = self.feed.fetch().await;
        self.state.set_feed_status(connection_status(&fetched));
        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "camera fetch failed");
                return CycleReport::FeedUnavailable(e.to_string());
            }
        };

        let Some(record) = records.into_iter().next() else {
            return CycleReport::Empty;
        };

        let key = record.event_key();
        if !self.dedup.is_new(&record) {
            tracing::trace!(%key, "duplicate detection skipped");
            return CycleReport::Duplicate(key);
        }

        tracing::info!(plate = record.plate(), captured_at = %record.captured_at(), "new detection");
        self.spawn_archive(&record);

        let outcome = self.resolve(&record).await;
        log_outcome(&record, &outcome);

        self.state
            .publish(CorrelationSnapshot::correlated(&record, outcome.clone()));
        self.dedup.mark_processed(&record);

        CycleReport::Correlated { key, outcome }
    }

    async fn resolve(&self, record: &DetectionRecord) -> AppointmentOutcome {
        let lookup = self.resolver.resolve(record.plate());
        match tokio::time::timeout(self.resolve_timeout, lookup).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::warn!(plate = record.plate(), error = %e, "appointment lookup failed");
                AppointmentOutcome::LookupFailed { reason: e.to_string() }
            }
            Err(_) => {
                tracing::warn!(
                    plate = record.plate(),
                    timeout_ms = self.resolve_timeout.as_millis() as u64,
                    "appointment lookup timed out"
                );
                AppointmentOutcome::LookupFailed {
                    reason: "appointment lookup timed out".to_string(),
                }
            }
        }
    }

    fn spawn_archive(&self, record: &DetectionRecord) {
        let archiver = Arc::clone(&self.archiver);
        let record = record.clone();
        tokio::spawn(async move {
            if let Err(e) = archiver.archive(&record).await {
                tracing::warn!(plate = record.plate(), error = %e, "archiving failed");
            }
        });
    }
}

fn log_outcome(record: &DetectionRecord, outcome: &AppointmentOutcome) {
    match outcome {
        AppointmentOutcome::Found { appointment } => {
            let order = appointment.order_number();
            let agency = appointment.agency();
            tracing::info!(
                plate = record.plate(),
                client = appointment.client_name().unwrap_or("N/A"),
                vehicle = appointment.vehicle().unwrap_or("N/A"),
                scheduled_for = appointment.scheduled_for().unwrap_or("N/A"),
                scheduled_time = appointment.scheduled_time().unwrap_or("N/A"),
                advisor = appointment.advisor().unwrap_or("N/A"),
                order = order.as_deref().unwrap_or("N/A"),
                service = appointment.service_description(),
                agency = agency.as_deref(),
                "appointment found"
            );
        }
        AppointmentOutcome::NotFound { reason } => {
            tracing::info!(plate = record.plate(), %reason, "no appointment")
        }
        AppointmentOutcome::LookupFailed { reason } => {
            tracing::warn!(plate = record.plate(), %reason, "appointment status unknown")
        }
    }
}
