//! Camera plate feed client.
//!
//! One [`FeedClient::fetch`] issues a single request for every plate captured
//! after the configured time, answers a digest challenge when the camera asks
//! for one, and decodes the XML response into [`DetectionRecord`]s.

pub mod decode;
pub mod digest;

use crate::DetectionFeed;
use digest::DigestAuth;
use lpr_core::config::{CameraConfig, FeedMethod};
use lpr_core::DetectionRecord;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode, Url};

pub use decode::{decode_plates, parse_capture_time};

/// Failure to obtain a decoded feed from the camera.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("camera unreachable: {0}")]
    Unreachable(String),
    #[error("camera request timed out")]
    Timeout,
    #[error("camera answered HTTP {0}")]
    HttpStatus(u16),
    #[error("camera feed could not be decoded: {0}")]
    Decode(String),
}

impl FeedError {
    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout
        } else {
            FeedError::Unreachable(err.to_string())
        }
    }

    /// Message shown to operators on the connectivity display.
    pub fn operator_message(&self) -> String {
        match self {
            FeedError::Unreachable(_) => {
                "No se pudo conectar con la cámara (Error de conexión)".to_string()
            }
            FeedError::Timeout => "Tiempo de espera agotado al conectar con la cámara".to_string(),
            FeedError::HttpStatus(code) => {
                format!("Error HTTP al conectar con la cámara: {code}")
            }
            FeedError::Decode(msg) => format!("Respuesta inválida de la cámara: {msg}"),
        }
    }
}

/// Digest-authenticated client for the camera's plate endpoint.
#[derive(Debug)]
pub struct FeedClient {
    http: reqwest::Client,
    url: Url,
    method: Method,
    body: String,
    auth: DigestAuth,
}

impl FeedClient {
    pub fn new(cfg: &CameraConfig) -> Result<Self, FeedError> {
        let url = Url::parse(&cfg.url)
            .map_err(|e| FeedError::Unreachable(format!("invalid camera url {}: {e}", cfg.url)))?;
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| FeedError::Unreachable(e.to_string()))?;
        let method = match cfg.method {
            FeedMethod::Get => Method::GET,
            FeedMethod::Post => Method::POST,
        };

        Ok(Self {
            http,
            url,
            method,
            body: request_body(&cfg.after_time),
            auth: DigestAuth::new(&cfg.username, &cfg.password),
        })
    }

    /// Fetch and decode the current feed, newest record first.
    pub async fn fetch(&self) -> Result<Vec<DetectionRecord>, FeedError> {
        let mut response = self.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let accepted = response
                .headers()
                .get_all(WWW_AUTHENTICATE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .any(|v| self.auth.accept_challenge(v));
            if !accepted {
                self.auth.forget();
                return Err(FeedError::HttpStatus(StatusCode::UNAUTHORIZED.as_u16()));
            }
            response = self.send().await?;
        }

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.auth.forget();
            }
            return Err(FeedError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(FeedError::from_transport)?;
        let records = decode_plates(&body)?;
        tracing::debug!(count = records.len(), "camera feed decoded");
        Ok(records)
    }

    async fn send(&self) -> Result<reqwest::Response, FeedError> {
        let mut request = self
            .http
            .request(self.method.clone(), self.url.clone())
            .header(CONTENT_TYPE, "application/xml")
            .body(self.body.clone());

        if let Some(value) = self.auth.authorization(self.method.as_str(), &request_uri(&self.url)) {
            request = request.header(AUTHORIZATION, value);
        }

        request.send().await.map_err(FeedError::from_transport)
    }
}

impl DetectionFeed for FeedClient {
    async fn fetch(&self) -> Result<Vec<DetectionRecord>, FeedError> {
        FeedClient::fetch(self).await
    }
}

fn request_body(after_time: &str) -> String {
    format!("<AfterTime><picTime>{after_time}</picTime></AfterTime>")
}

/// Path and query as they appear on the request line.
fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{q}", url.path()),
        None => url.path().to_string(),
    }
}
