//! lpr-core: shared building blocks of the plate correlation engine.
//!
//! # Architecture
//!
//! ```text
//! Feed ──► EventDeduplicator ──► AppointmentResolver ──► CorrelationState ──► readers
//! ```
//!
//! This crate holds the pieces with no I/O: the normalised detection types,
//! duplicate suppression, the shared snapshot, and configuration. Network
//! clients live in `lpr-feeds`; the poll loop and read API live in the
//! `lpr-monitor` binary crate.

pub mod config;
pub mod dedup;
pub mod state;
pub mod types;

pub use dedup::EventDeduplicator;
pub use state::{CorrelationSnapshot, CorrelationState, FeedStatus};
pub use types::{AppointmentData, AppointmentOutcome, DetectionRecord, EventKey};
