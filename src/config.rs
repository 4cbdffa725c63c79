//! Runtime settings.
//!
//! Layered configuration: built-in defaults, an optional TOML file, and a
//! `DRIVEUP_*` environment overlay (nested keys separated with `__`, e.g.
//! `DRIVEUP_API__ACCESS_TOKEN`).

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Number of concurrent uploads (worker pool size).
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Ceiling wait for an upload slot before the run fails, in seconds.
    #[serde(default = "default_permit_timeout_secs")]
    pub permit_timeout_secs: u64,

    /// Name of the well-known top-level remote folder. Must already exist.
    #[serde(default = "default_root_folder")]
    pub root_folder: String,

    /// Remote API endpoints and credentials.
    #[serde(default)]
    pub api: ApiSettings,
}

/// Remote drive API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL for metadata operations (list, folder create).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL for content uploads.
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Bearer token for an already-authenticated session.
    #[serde(default)]
    pub access_token: Option<String>,

    /// File holding the bearer token, used when `access_token` is unset.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

fn default_worker_count() -> usize {
    2
}

fn default_permit_timeout_secs() -> u64 {
    // 6 hours; uploads over slow uplinks can hold slots for a long time.
    6 * 60 * 60
}

fn default_root_folder() -> String {
    "Videos".to_string()
}

fn default_base_url() -> String {
    "https://www.googleapis.com/drive/v2".to_string()
}

fn default_upload_url() -> String {
    "https://www.googleapis.com/upload/drive/v2".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            permit_timeout_secs: default_permit_timeout_secs(),
            root_folder: default_root_folder(),
            api: ApiSettings::default(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            upload_url: default_upload_url(),
            access_token: None,
            token_file: None,
        }
    }
}

impl Settings {
    /// Load settings from the optional config file plus environment overlay.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path.to_path_buf()));
        }
        builder = builder.add_source(
            Environment::with_prefix("DRIVEUP")
                // Single underscore between prefix and key, double underscore
                // between nested keys: DRIVEUP_WORKER_COUNT,
                // DRIVEUP_API__ACCESS_TOKEN.
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
        builder.build()?.try_deserialize()
    }

    /// Ceiling wait for an upload slot.
    pub fn permit_timeout(&self) -> Duration {
        Duration::from_secs(self.permit_timeout_secs)
    }
}
