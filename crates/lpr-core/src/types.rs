//! Core types for lpr-core.
//!
//! This module defines the values that flow through the correlation engine:
//! the normalised [`DetectionRecord`] produced by the feed client, the
//! [`EventKey`] used for duplicate suppression, and the [`AppointmentOutcome`]
//! returned by an appointment lookup.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use serde_json::Value;

/// Plate text the camera reports when recognition failed.
pub const UNKNOWN_PLATE: &str = "UNKNOWN";

/// One vehicle capture reported by the camera.
///
/// Construct through [`DetectionRecord::new`], which applies plate
/// normalisation and rejects sentinel plates, so every value in circulation
/// satisfies the plate invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionRecord {
    plate: String,
    captured_at: DateTime<FixedOffset>,
    country: Option<String>,
}

impl DetectionRecord {
    /// Build a record from raw plate text. Returns `None` when the plate is
    /// empty after normalisation or equals [`UNKNOWN_PLATE`].
    pub fn new(
        raw_plate: &str,
        captured_at: DateTime<FixedOffset>,
        country: Option<String>,
    ) -> Option<Self> {
        let plate = normalize_plate(raw_plate)?;
        Some(Self {
            plate,
            captured_at,
            country: country.filter(|c| !c.trim().is_empty()),
        })
    }

    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn captured_at(&self) -> DateTime<FixedOffset> {
        self.captured_at
    }

    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// Deduplication key for this capture.
    pub fn event_key(&self) -> EventKey {
        EventKey::new(&self.plate, self.captured_at)
    }
}

/// Strip everything outside `[A-Za-z0-9]` and upper-case the rest.
///
/// Returns `None` for plates that are empty after stripping or that spell
/// the camera's "unknown" sentinel.
pub fn normalize_plate(raw: &str) -> Option<String> {
    let plate: String = raw
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if plate.is_empty() || plate == UNKNOWN_PLATE {
        None
    } else {
        Some(plate)
    }
}

/// `PLATE_YYYYMMDDHHMMSS` identifier of a physical detection event.
///
/// The timestamp part is rendered in UTC at second precision, so two
/// notations of the same instant produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey(String);

impl EventKey {
    pub fn new(plate: &str, captured_at: DateTime<FixedOffset>) -> Self {
        let utc = captured_at.with_timezone(&Utc);
        Self(format!("{}_{}", plate, utc.format("%Y%m%d%H%M%S")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// First appointment record returned by the appointment service.
///
/// The payload is passed through untouched; the accessors below only exist
/// for console reporting and return `None` when a field is absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AppointmentData(pub Value);

impl AppointmentData {
    fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    pub fn client_name(&self) -> Option<&str> {
        self.text("nombreCliente")
    }

    pub fn vehicle(&self) -> Option<&str> {
        self.text("descripcionVeh")
    }

    pub fn scheduled_for(&self) -> Option<&str> {
        self.text("fechaCita")
    }

    /// `horaCita`, else the time part of a `fechaCita` like `2025-04-15 10:00`.
    pub fn scheduled_time(&self) -> Option<&str> {
        self.text("horaCita")
            .or_else(|| self.scheduled_for()?.split_once(' ').map(|(_, time)| time))
            .filter(|s| !s.is_empty())
    }

    pub fn service_description(&self) -> Option<&str> {
        self.text("descripcionAlterna")
    }

    pub fn agency(&self) -> Option<String> {
        self.text_or_number("agencia")
    }

    pub fn advisor(&self) -> Option<&str> {
        self.text("nombreAsesor").or_else(|| self.text("asesor"))
    }

    pub fn order_number(&self) -> Option<String> {
        self.text_or_number("ordenrepld")
    }

    fn text_or_number(&self, key: &str) -> Option<String> {
        match self.0.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Result of looking up a plate in the appointment service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AppointmentOutcome {
    Found { appointment: AppointmentData },
    NotFound { reason: String },
    LookupFailed { reason: String },
}

impl AppointmentOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, AppointmentOutcome::Found { .. })
    }

    pub fn appointment(&self) -> Option<&AppointmentData> {
        match self {
            AppointmentOutcome::Found { appointment } => Some(appointment),
            _ => None,
        }
    }

    /// Short status label for displays.
    pub fn label(&self) -> &'static str {
        match self {
            AppointmentOutcome::Found { .. } => "found",
            AppointmentOutcome::NotFound { .. } => "not_found",
            AppointmentOutcome::LookupFailed { .. } => "lookup_failed",
        }
    }

    /// Operator-facing message for the outcome.
    pub fn message(&self) -> &str {
        match self {
            AppointmentOutcome::Found { .. } => "CITA ENCONTRADA",
            AppointmentOutcome::NotFound { reason } => reason,
            AppointmentOutcome::LookupFailed { .. } => "ERROR DE CONEXIÓN",
        }
    }
}
