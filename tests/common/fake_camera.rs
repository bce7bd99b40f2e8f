//! Fake plate camera for integration tests.
//!
//! Spins up a minimal `axum` HTTP server on a random TCP port bound to
//! 127.0.0.1. Serves `/ISAPI/Traffic/channels/1/vehicleDetect/plates` for any
//! method and demands HTTP digest authentication (`qop=auth`) before
//! returning the configured document.
//!
//! # Example
//!
//! ```rust,no_run
//! let camera = FakeCamera::start().await.unwrap();
//! camera.set_document(PLATES_NAMESPACED).await;
//! let cfg = camera_config(&camera.feed_url());
//! ```

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use lpr_feeds::camera::digest::{compute_response, DigestChallenge};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const FEED_PATH: &str = "/ISAPI/Traffic/channels/1/vehicleDetect/plates";
const REALM: &str = "IP Camera(C1234)";
const OPAQUE: &str = "5ccc069c403ebaf9f0171e9517f40e41";

/// State shared between the router and test code.
struct CameraState {
    user: String,
    password: String,
    nonce: String,
    document: String,
    /// When set, every request answers this status.
    forced_status: Option<StatusCode>,
    delay: Option<Duration>,
    challenges_sent: usize,
    authorized_requests: usize,
    methods: Vec<Method>,
    bodies: Vec<String>,
    nonce_counts: Vec<String>,
}

/// Handle to the running fake camera.
pub struct FakeCamera {
    addr: SocketAddr,
    state: Arc<Mutex<CameraState>>,
}

impl FakeCamera {
    /// Start with the builder credentials and an empty document.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(CameraState {
            user: super::CAMERA_USER.to_string(),
            password: super::CAMERA_PASSWORD.to_string(),
            nonce: "4e6a4d7a4e6a4d7a4e6a4d7a".to_string(),
            document: super::PLATES_EMPTY.to_string(),
            forced_status: None,
            delay: None,
            challenges_sent: 0,
            authorized_requests: 0,
            methods: Vec::new(),
            bodies: Vec::new(),
            nonce_counts: Vec::new(),
        }));

        let app = Router::new()
            .route(FEED_PATH, any(plates))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self { addr, state })
    }

    /// Full URL of the plate endpoint.
    pub fn feed_url(&self) -> String {
        format!("http://{}{}", self.addr, FEED_PATH)
    }

    pub async fn set_document(&self, document: impl Into<String>) {
        self.state.lock().await.document = document.into();
    }

    pub async fn force_status(&self, status: Option<StatusCode>) {
        self.state.lock().await.forced_status = status;
    }

    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.delay = delay;
    }

    /// Issue a new nonce; requests signed with the old one get a fresh `401`.
    pub async fn rotate_nonce(&self, nonce: &str) {
        self.state.lock().await.nonce = nonce.to_string();
    }

    pub async fn challenges_sent(&self) -> usize {
        self.state.lock().await.challenges_sent
    }

    pub async fn authorized_requests(&self) -> usize {
        self.state.lock().await.authorized_requests
    }

    pub async fn methods(&self) -> Vec<Method> {
        self.state.lock().await.methods.clone()
    }

    pub async fn bodies(&self) -> Vec<String> {
        self.state.lock().await.bodies.clone()
    }

    pub async fn nonce_counts(&self) -> Vec<String> {
        self.state.lock().await.nonce_counts.clone()
    }
}

// ---------------------------------------------------------------------------
// Digest verification
// ---------------------------------------------------------------------------

/// Parse the client's `Authorization: Digest ...` header.
fn authorization_params(value: &str) -> Option<HashMap<String, String>> {
    let rest = value.strip_prefix("Digest ")?;
    Some(
        rest.split(", ")
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim_matches('"').to_string()))
            .collect(),
    )
}

fn verify(state: &CameraState, method: &Method, headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let params = authorization_params(value)?;
    if params.get("username")? != &state.user || params.get("nonce")? != &state.nonce {
        return None;
    }

    let challenge = DigestChallenge {
        realm: REALM.to_string(),
        nonce: state.nonce.clone(),
        opaque: Some(OPAQUE.to_string()),
        qop_auth: true,
        session: false,
    };
    let nc = params.get("nc")?;
    let expected = compute_response(
        &challenge,
        &state.user,
        &state.password,
        method.as_str(),
        params.get("uri")?,
        nc,
        params.get("cnonce")?,
    );
    (params.get("response")? == &expected).then(|| nc.clone())
}

// ---------------------------------------------------------------------------
// Route handler
// ---------------------------------------------------------------------------

async fn plates(
    State(state): State<Arc<Mutex<CameraState>>>,
    method: Method,
    headers: HeaderMap,
    body: String,
) -> Response {
    let delay = state.lock().await.delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = state.lock().await;
    if let Some(status) = state.forced_status {
        return status.into_response();
    }

    let Some(nc) = verify(&state, &method, &headers) else {
        state.challenges_sent += 1;
        let challenge = format!(
            r#"Digest realm="{REALM}", qop="auth", nonce="{}", opaque="{OPAQUE}""#,
            state.nonce
        );
        return (StatusCode::UNAUTHORIZED, [(header::WWW_AUTHENTICATE, challenge)]).into_response();
    };

    state.authorized_requests += 1;
    state.methods.push(method);
    state.bodies.push(body);
    state.nonce_counts.push(nc);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        state.document.clone(),
    )
        .into_response()
}
