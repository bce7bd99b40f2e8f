//! Appointment lookup by plate.
//!
//! The service is queried with `GET {url}?noCia=..&placa=..&agencia=..` and
//! answers `{codigo, mensaje, listadoDatosAgendamiento: [...]}`. A `codigo` of
//! `"0"` (or `0`) with a non-empty list means an appointment exists; any other
//! well-formed answer means it does not.

use lpr_core::config::AppointmentsConfig;
use lpr_core::{AppointmentData, AppointmentOutcome};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;

const DEFAULT_NOT_FOUND: &str = "NO SE ENCONTRARON RESULTADOS";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("appointment service unreachable: {0}")]
    Transport(String),
    #[error("appointment lookup timed out")]
    Timeout,
    #[error("appointment service answered HTTP {0}")]
    HttpStatus(u16),
    #[error("appointment response malformed: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ResolveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ResolveError::Timeout
        } else if err.is_decode() {
            ResolveError::Malformed(err.to_string())
        } else {
            ResolveError::Transport(err.to_string())
        }
    }
}

/// Looks up whether a plate has a scheduled appointment.
pub trait AppointmentResolver: Send + Sync {
    fn resolve(
        &self,
        plate: &str,
    ) -> impl Future<Output = Result<AppointmentOutcome, ResolveError>> + Send;
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    codigo: Value,
    #[serde(default)]
    mensaje: Option<String>,
    #[serde(default, rename = "listadoDatosAgendamiento")]
    appointments: Option<Vec<Value>>,
}

fn is_success_code(code: &Value) -> bool {
    match code {
        Value::String(s) => s.trim() == "0",
        Value::Number(n) => n.as_i64() == Some(0),
        _ => false,
    }
}

/// Map a decoded service answer to an outcome.
pub fn interpret(body: Value) -> Result<AppointmentOutcome, ResolveError> {
    let response: LookupResponse =
        serde_json::from_value(body).map_err(|e| ResolveError::Malformed(e.to_string()))?;

    let first = response
        .appointments
        .and_then(|list| list.into_iter().next())
        .filter(|_| is_success_code(&response.codigo));

    Ok(match first {
        Some(appointment) => AppointmentOutcome::Found {
            appointment: AppointmentData(appointment),
        },
        None => AppointmentOutcome::NotFound {
            reason: response
                .mensaje
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NOT_FOUND.to_string()),
        },
    })
}

/// [`AppointmentResolver`] backed by the appointment web service.
#[derive(Debug, Clone)]
pub struct HttpAppointmentResolver {
    http: reqwest::Client,
    url: String,
    company: String,
    agency: String,
}

impl HttpAppointmentResolver {
    pub fn new(cfg: &AppointmentsConfig) -> Result<Self, ResolveError> {
        let http = reqwest::Client::builder().timeout(cfg.timeout()).build()?;
        Ok(Self {
            http,
            url: cfg.url.clone(),
            company: cfg.company.clone(),
            agency: cfg.agency.clone(),
        })
    }
}

impl AppointmentResolver for HttpAppointmentResolver {
    async fn resolve(&self, plate: &str) -> Result<AppointmentOutcome, ResolveError> {
        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("noCia", self.company.as_str()),
                ("placa", plate),
                ("agencia", self.agency.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::HttpStatus(status.as_u16()));
        }

        let body: Value = response.json().await?;
        let outcome = interpret(body)?;
        tracing::debug!(plate, outcome = outcome.label(), "appointment lookup complete");
        Ok(outcome)
    }
}
