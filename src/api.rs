//! Read-only HTTP API for display clients.
//!
//! - `GET /datos`: latest correlation merged with camera connectivity
//! - `GET /verificar-conexion`: camera connectivity and recent event count
//! - `GET /healthz`: liveness
//!
//! Handlers only read [`CorrelationState`]; they never reach the camera.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Local;
use lpr_core::{AppointmentData, CorrelationSnapshot, CorrelationState, FeedStatus};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Body of `GET /datos`.
#[derive(Debug, Serialize)]
pub struct DetectionView {
    pub placa: Option<String>,
    pub fecha: Option<String>,
    pub tiene_cita: bool,
    pub datos_cita: Option<AppointmentData>,
    pub mensaje: Option<String>,
    pub estado_cita: &'static str,
    pub actualizado: String,
    pub camara_conectada: bool,
    pub mensaje_estado: String,
}

impl DetectionView {
    pub fn new(snapshot: &CorrelationSnapshot, feed: &FeedStatus) -> Self {
        let outcome = snapshot.outcome.as_ref();
        Self {
            placa: snapshot.plate.clone(),
            fecha: snapshot
                .detected_at
                .map(|at| at.format(DISPLAY_FORMAT).to_string()),
            tiene_cita: outcome.is_some_and(|o| o.is_found()),
            datos_cita: outcome.and_then(|o| o.appointment()).cloned(),
            mensaje: outcome.map(|o| o.message().to_string()),
            estado_cita: outcome.map_or("pending", |o| o.label()),
            actualizado: snapshot
                .last_updated_at
                .with_timezone(&Local)
                .format(DISPLAY_FORMAT)
                .to_string(),
            camara_conectada: feed.connected,
            mensaje_estado: feed.message.clone(),
        }
    }
}

/// Body of `GET /verificar-conexion`.
#[derive(Debug, Serialize)]
pub struct ConnectionView {
    pub estado: &'static str,
    pub mensaje: String,
    pub eventos_recientes: usize,
}

impl From<&FeedStatus> for ConnectionView {
    fn from(feed: &FeedStatus) -> Self {
        Self {
            estado: if feed.connected { "Activo" } else { "Sin conexión" },
            mensaje: feed.message.clone(),
            eventos_recientes: feed.recent_events,
        }
    }
}

pub fn router(state: Arc<CorrelationState>) -> Router {
    Router::new()
        .route("/datos", get(datos))
        .route("/verificar-conexion", get(verificar_conexion))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Serve the API on an already-bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, state: Arc<CorrelationState>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "read API listening");
    }
    axum::serve(listener, router(state)).await
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

async fn datos(State(state): State<Arc<CorrelationState>>) -> Json<DetectionView> {
    let snapshot = state.snapshot();
    Json(DetectionView::new(&snapshot, &state.feed_status()))
}

async fn verificar_conexion(State(state): State<Arc<CorrelationState>>) -> Json<ConnectionView> {
    Json(ConnectionView::from(&state.feed_status()))
}

async fn healthz() -> &'static str {
    "ok"
}
