//! lpr-feeds: network clients for lpr-monitor.
//!
//! - [`camera`]: digest-authenticated plate feed client and XML decoding
//! - [`appointments`]: appointment lookup by plate
//! - [`archive`]: fire-and-forget detection archiving
//!
//! Each collaborator sits behind a trait so the poll loop can be driven by
//! in-memory fakes in tests.

pub mod appointments;
pub mod archive;
pub mod camera;

use lpr_core::{DetectionRecord, FeedStatus};
use std::future::Future;

pub use appointments::{AppointmentResolver, HttpAppointmentResolver, ResolveError};
pub use archive::{ArchivalError, Archiver, HttpArchiver, NoArchiver};
pub use camera::{FeedClient, FeedError};

/// Source of detection records, newest first.
pub trait DetectionFeed: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Vec<DetectionRecord>, FeedError>> + Send;

    /// One fetch reported as a connectivity status.
    fn check_connection(&self) -> impl Future<Output = FeedStatus> + Send {
        async move { connection_status(&self.fetch().await) }
    }
}

/// Connectivity implied by a fetch result: up with the event count, or down
/// with the operator-facing message.
pub fn connection_status(result: &Result<Vec<DetectionRecord>, FeedError>) -> FeedStatus {
    match result {
        Ok(records) => FeedStatus::up(records.len()),
        Err(e) => FeedStatus::down(e.operator_message()),
    }
}
