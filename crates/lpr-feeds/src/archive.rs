//! Forwarding of raw detections to the archival endpoint.
//!
//! Archiving never influences correlation: the poll loop runs it on a detached
//! task and only logs the result.

use lpr_core::config::ArchiveConfig;
use lpr_core::DetectionRecord;
use std::future::Future;

#[derive(Debug, thiserror::Error)]
pub enum ArchivalError {
    #[error("archive endpoint unreachable: {0}")]
    Transport(String),
    #[error("archive endpoint answered HTTP {0}")]
    HttpStatus(u16),
}

impl From<reqwest::Error> for ArchivalError {
    fn from(err: reqwest::Error) -> Self {
        ArchivalError::Transport(err.to_string())
    }
}

pub trait Archiver: Send + Sync + 'static {
    fn archive(
        &self,
        record: &DetectionRecord,
    ) -> impl Future<Output = Result<(), ArchivalError>> + Send;
}

/// Archiver used when no endpoint is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoArchiver;

impl Archiver for NoArchiver {
    async fn archive(&self, _record: &DetectionRecord) -> Result<(), ArchivalError> {
        Ok(())
    }
}

/// Form fields sent for one record. Date and time are in the camera's own
/// offset.
pub fn archive_form(record: &DetectionRecord, origin: &str) -> [(&'static str, String); 4] {
    let at = record.captured_at();
    [
        ("placa", record.plate().to_string()),
        ("fecha", at.format("%Y-%m-%d").to_string()),
        ("hora", at.format("%H:%M:%S").to_string()),
        ("origen", origin.to_string()),
    ]
}

/// Form-POST archiver.
#[derive(Debug, Clone)]
pub struct HttpArchiver {
    http: reqwest::Client,
    url: String,
    origin: String,
}

impl HttpArchiver {
    /// Returns `Ok(None)` when archiving is disabled.
    pub fn from_config(cfg: &ArchiveConfig) -> Result<Option<Self>, ArchivalError> {
        let Some(url) = cfg.url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Ok(None);
        };
        let http = reqwest::Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Some(Self {
            http,
            url: url.to_string(),
            origin: cfg.origin.clone(),
        }))
    }
}

impl Archiver for HttpArchiver {
    async fn archive(&self, record: &DetectionRecord) -> Result<(), ArchivalError> {
        let response = self
            .http
            .post(&self.url)
            .form(&archive_form(record, &self.origin))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArchivalError::HttpStatus(status.as_u16()));
        }
        tracing::info!(plate = record.plate(), "detection archived");
        Ok(())
    }
}
