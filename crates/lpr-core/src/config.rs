//! Configuration types for lpr-monitor.
//!
//! [`Config::load`] layers, in order: the embedded defaults below, an optional
//! TOML file, and `LPR__SECTION__KEY` environment variables (for example
//! `LPR__CAMERA__PASSWORD`). [`Config::defaults`] returns the embedded
//! defaults without touching the filesystem or environment (useful in tests).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[camera]
url             = "http://192.168.1.64/ISAPI/Traffic/channels/1/vehicleDetect/plates"
username        = "admin"
password        = ""
method          = "get"
after_time      = "20250415T000000-500"
timeout_secs    = 10

[appointments]
url          = "http://localhost:8080/citas/consultarPorPlaca"
company      = ""
agency       = ""
timeout_secs = 10

[archive]
origin       = "Cámara IP"
timeout_secs = 5

[monitor]
poll_interval_ms = 1000

[server]
bind = "0.0.0.0:5000"
"#;

const DEFAULT_CONFIG_FILE: &str = "lpr-monitor.toml";
const ENV_PREFIX: &str = "LPR";

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    pub appointments: AppointmentsConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// HTTP verb used against the camera's plate endpoint. Some firmware only
/// answers a GET carrying the `AfterTime` body, others expect POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMethod {
    Get,
    Post,
}

/// `[camera]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub method: FeedMethod,
    /// Lower bound sent in the `AfterTime/picTime` request body.
    pub after_time: String,
    pub timeout_secs: u64,
}

/// `[appointments]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentsConfig {
    pub url: String,
    /// Sent as `noCia`.
    pub company: String,
    /// Sent as `agencia`.
    pub agency: String,
    pub timeout_secs: u64,
}

/// `[archive]` section. Archiving is disabled when `url` is unset.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_archive_timeout")]
    pub timeout_secs: u64,
}

fn default_origin() -> String { "Cámara IP".to_string() }
fn default_archive_timeout() -> u64 { 5 }

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            url: None,
            origin: default_origin(),
            timeout_secs: default_archive_timeout(),
        }
    }
}

/// `[monitor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Bound on the processed-event memory. Unset keeps every key for the
    /// lifetime of the process.
    #[serde(default)]
    pub dedup_retention_secs: Option<u64>,
}

fn default_poll_interval_ms() -> u64 { 1000 }

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            dedup_retention_secs: None,
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "0.0.0.0:5000".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl CameraConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppointmentsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ArchiveConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn dedup_retention(&self) -> Option<chrono::Duration> {
        self.dedup_retention_secs
            .and_then(|s| chrono::Duration::try_seconds(i64::try_from(s).ok()?))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load configuration. `path` overrides the default `lpr-monitor.toml` in
    /// the working directory; a missing default file is not an error, a
    /// missing explicit file is.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_env(path, None)
    }

    /// `env` replaces the process environment as the override source when
    /// given.
    fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> anyhow::Result<Self> {
        let (file, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let cfg: Config = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(file.as_path()).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.camera.url.trim().is_empty() {
            anyhow::bail!("camera.url must be set");
        }
        if self.appointments.url.trim().is_empty() {
            anyhow::bail!("appointments.url must be set");
        }
        if self.monitor.poll_interval_ms == 0 {
            anyhow::bail!("monitor.poll_interval_ms must be greater than zero");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
