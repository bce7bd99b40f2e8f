//! Fake appointment service and archive endpoint.
//!
//! Both run as `axum` servers on random 127.0.0.1 ports and record what they
//! receive so harnesses can assert on calls.

use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const APPOINTMENTS_PATH: &str = "/citas/consultarPorPlaca";
pub const ARCHIVE_PATH: &str = "/insertar.php";

async fn spawn(app: Router) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Ok(addr)
}

// ---------------------------------------------------------------------------
// Appointment service
// ---------------------------------------------------------------------------

#[derive(Default)]
struct AppointmentState {
    /// Answers keyed by plate; unknown plates get `fallback`.
    answers: HashMap<String, Value>,
    fallback: Option<Value>,
    delay: Option<Duration>,
    queries: Vec<HashMap<String, String>>,
}

pub struct FakeAppointments {
    addr: SocketAddr,
    state: Arc<Mutex<AppointmentState>>,
}

impl FakeAppointments {
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(Mutex::new(AppointmentState {
            fallback: Some(super::appointment_missing()),
            ..AppointmentState::default()
        }));
        let app = Router::new()
            .route(APPOINTMENTS_PATH, get(lookup))
            .with_state(state.clone());
        let addr = spawn(app).await?;
        Ok(Self { addr, state })
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, APPOINTMENTS_PATH)
    }

    pub async fn answer(&self, plate: &str, body: Value) {
        self.state.lock().await.answers.insert(plate.to_string(), body);
    }

    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.delay = delay;
    }

    /// Query strings received so far, in order.
    pub async fn queries(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().await.queries.clone()
    }
}

async fn lookup(
    State(state): State<Arc<Mutex<AppointmentState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (answer, delay) = {
        let mut state = state.lock().await;
        state.queries.push(params.clone());
        let plate = params.get("placa").cloned().unwrap_or_default();
        let answer = state.answers.get(&plate).cloned().or_else(|| state.fallback.clone());
        (answer, state.delay)
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    match answer {
        Some(body) => Json(body).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

// ---------------------------------------------------------------------------
// Archive endpoint
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ArchiveState {
    forms: Vec<HashMap<String, String>>,
}

pub struct FakeArchive {
    addr: SocketAddr,
    state: Arc<Mutex<ArchiveState>>,
}

impl FakeArchive {
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(Mutex::new(ArchiveState::default()));
        let app = Router::new()
            .route(ARCHIVE_PATH, post(insert))
            .with_state(state.clone());
        let addr = spawn(app).await?;
        Ok(Self { addr, state })
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, ARCHIVE_PATH)
    }

    pub async fn forms(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().await.forms.clone()
    }

    /// Non-blocking count for use inside `eventually`.
    pub fn try_count(&self) -> usize {
        self.state.try_lock().map(|s| s.forms.len()).unwrap_or(0)
    }
}

async fn insert(
    State(state): State<Arc<Mutex<ArchiveState>>>,
    Form(form): Form<HashMap<String, String>>,
) -> &'static str {
    state.lock().await.forms.push(form);
    "Registro insertado"
}
