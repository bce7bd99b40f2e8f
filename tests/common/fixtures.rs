//! Canned camera documents and appointment-service answers.
//!
//! Camera documents follow the shapes real firmware sends: with the ISAPI
//! namespace, without any namespace, and with the 3-digit offset quirk.

use serde_json::{json, Value};

pub const ISAPI_NS: &str = "http://www.hikvision.com/ver20/XMLSchema";

/// Two captures, listed oldest first as the camera does.
pub const PLATES_NAMESPACED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Plates version="2.0" xmlns="http://www.hikvision.com/ver20/XMLSchema">
  <Plate>
    <captureTime>20250415T092958-500</captureTime>
    <plateNumber>gsc-0456</plateNumber>
    <country>EC</country>
  </Plate>
  <Plate>
    <captureTime>20250415T093000-500</captureTime>
    <plateNumber>PBX-1234</plateNumber>
    <country>EC</country>
  </Plate>
</Plates>"#;

/// The same captures with no namespace and extended timestamps.
pub const PLATES_PLAIN: &str = r#"<Plates>
  <Plate>
    <captureTime>2025-04-15T09:29:58-05:00</captureTime>
    <plateNumber>GSC0456</plateNumber>
  </Plate>
  <Plate>
    <captureTime>2025-04-15T09:30:00-05:00</captureTime>
    <plateNumber>PBX1234</plateNumber>
  </Plate>
</Plates>"#;

/// Entries the decoder must drop: sentinel plate, missing time, bad time.
pub const PLATES_WITH_JUNK: &str = r#"<Plates xmlns="http://www.hikvision.com/ver20/XMLSchema">
  <Plate><captureTime>20250415T093100-500</captureTime><plateNumber>unknown</plateNumber></Plate>
  <Plate><plateNumber>NOTIME1</plateNumber></Plate>
  <Plate><captureTime>not-a-time</captureTime><plateNumber>BADTIME</plateNumber></Plate>
  <Plate><captureTime>20250415T093000-500</captureTime><plateNumber>PBX-1234</plateNumber></Plate>
</Plates>"#;

pub const PLATES_EMPTY: &str =
    r#"<Plates xmlns="http://www.hikvision.com/ver20/XMLSchema"></Plates>"#;

pub const NOT_XML: &str = "<html><body>Service Unavailable";

/// Build a one-capture document.
pub fn single_plate(plate: &str, capture_time: &str) -> String {
    format!(
        r#"<Plates xmlns="{ISAPI_NS}"><Plate><captureTime>{capture_time}</captureTime><plateNumber>{plate}</plateNumber></Plate></Plates>"#
    )
}

/// Appointment-service answer carrying one appointment.
pub fn appointment_found(plate: &str) -> Value {
    json!({
        "codigo": "0",
        "mensaje": "OK",
        "listadoDatosAgendamiento": [{
            "placa": plate,
            "nombreCliente": "Ana Pérez",
            "descripcionVeh": "SUV 2022",
            "fechaCita": "2025-04-15 10:00",
            "nombreAsesor": "Luis Mora",
            "ordenrepld": 4512
        }]
    })
}

pub fn appointment_missing() -> Value {
    json!({
        "codigo": "1",
        "mensaje": "NO EXISTEN CITAS PARA LA PLACA",
        "listadoDatosAgendamiento": []
    })
}
