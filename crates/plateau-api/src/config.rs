//! # Service Configuration
//!
//! Resolution order, later sources winning:
//!
//! 1. Built-in defaults.
//! 2. A JSON file named by `PLATEAU_CONFIG`, if set. Missing keys keep
//!    their defaults.
//! 3. `PLATEAU_*` environment variables.
//!
//! | Variable                       | Field                  | Default               |
//! |--------------------------------|------------------------|-----------------------|
//! | `PLATEAU_PORT`                 | `port`                 | `8080`                |
//! | `PLATEAU_ARCHIVE_ROOT`         | `archive_root`         | `saved_data/archives` |
//! | `PLATEAU_STAGING_DIR`          | `staging_dir`          | `saved_data/staging`  |
//! | `PLATEAU_REQUEST_TIMEOUT_SECS` | `request_timeout_secs` | `10`                  |
//! | `PLATEAU_MAX_UPLOAD_BYTES`     | `max_upload_bytes`     | `10485760`            |
//! | `PLATEAU_METRICS_ENABLED`      | `metrics_enabled`      | `true`                |
//! | `PLATEAU_LOG_JSON`             | `log_json`             | `false`               |

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_FILE_VAR: &str = "PLATEAU_CONFIG";

/// Error loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration for the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory holding committed archives and their work areas.
    pub archive_root: PathBuf,
    /// Directory receiving uploads before they are archived.
    pub staging_dir: PathBuf,
    /// Deadline for the blocking work behind a single request.
    pub request_timeout_secs: u64,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
    pub metrics_enabled: bool,
    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            archive_root: PathBuf::from("saved_data/archives"),
            staging_dir: PathBuf::from("saved_data/staging"),
            request_timeout_secs: 10,
            max_upload_bytes: 10 * 1024 * 1024,
            metrics_enabled: true,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base = match lookup(CONFIG_FILE_VAR) {
            Some(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        base.with_env(lookup)
    }

    /// Parse a JSON config file. Absent keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `PLATEAU_*` overrides found through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("PLATEAU_PORT") {
            self.port = parse_env("PLATEAU_PORT", &v)?;
        }
        if let Some(v) = lookup("PLATEAU_ARCHIVE_ROOT") {
            self.archive_root = non_empty_path("PLATEAU_ARCHIVE_ROOT", v)?;
        }
        if let Some(v) = lookup("PLATEAU_STAGING_DIR") {
            self.staging_dir = non_empty_path("PLATEAU_STAGING_DIR", v)?;
        }
        if let Some(v) = lookup("PLATEAU_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("PLATEAU_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("PLATEAU_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = parse_env("PLATEAU_MAX_UPLOAD_BYTES", &v)?;
        }
        if let Some(v) = lookup("PLATEAU_METRICS_ENABLED") {
            self.metrics_enabled = parse_bool("PLATEAU_METRICS_ENABLED", &v)?;
        }
        if let Some(v) = lookup("PLATEAU_LOG_JSON") {
            self.log_json = parse_bool("PLATEAU_LOG_JSON", &v)?;
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidEnv {
                var: "PLATEAU_REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

fn non_empty_path(var: &'static str, value: String) -> Result<PathBuf, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidEnv {
            var,
            value,
            reason: "path must not be empty".to_string(),
        });
    }
    Ok(PathBuf::from(value))
}
