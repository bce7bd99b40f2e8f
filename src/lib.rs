//! lpr-monitor: license plate monitor.
//!
//! Watches a plate-recognition camera, looks up each new plate in the
//! appointment service and publishes the latest result for display clients.
//!
//! # Architecture
//!
//! ```text
//! FeedClient ──► EventDeduplicator ──► AppointmentResolver ──► CorrelationState ──► API
//!                       │
//!                       └──► Archiver (detached)
//! ```
//!
//! [`monitor::PollLoop`] drives the pipeline on one task; the [`api`] router
//! reads the shared state from any number of requests.

pub mod api;
pub mod monitor;

pub use monitor::{CycleReport, PollLoop};
