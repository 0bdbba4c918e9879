// Configuration loading and parsing (draftsync.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionOptions;
use crate::transport::ReconnectPolicy;

/// File name searched for in the working directory and the platform config
/// directory.
pub const CONFIG_FILE_NAME: &str = "draftsync.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Where the draft server lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the REST API, e.g. `http://127.0.0.1:8000/api`.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Base URL of the WebSocket endpoint; room id and user name are appended.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds added to the room's turn timer before a pending pick times out.
    #[serde(default = "default_pick_grace_secs")]
    pub pick_grace_secs: u64,
    /// Capacity of the transport-to-session channels.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// How many diagnostics a slow subscriber may lag behind.
    #[serde(default = "default_diagnostics_capacity")]
    pub diagnostics_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            pick_grace_secs: default_pick_grace_secs(),
            channel_capacity: default_channel_capacity(),
            diagnostics_capacity: default_diagnostics_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Consecutive failed attempts before giving up; 0 retries forever.
    #[serde(default)]
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfig {
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_attempts: 0,
        }
    }
}

fn default_api_url() -> String {
    "http://127.0.0.1:8000/api".into()
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:8000/ws".into()
}

fn default_pick_grace_secs() -> u64 {
    5
}

fn default_channel_capacity() -> usize {
    256
}

fn default_diagnostics_capacity() -> usize {
    64
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Config {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            pick_grace: Duration::from_secs(self.session.pick_grace_secs),
            diagnostics_capacity: self.session.diagnostics_capacity,
        }
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_backoff: Duration::from_millis(self.reconnect.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.reconnect.max_backoff_ms),
            max_attempts: match self.reconnect.max_attempts {
                0 => None,
                n => Some(n),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from a specific file.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let text = read_file(path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Locate the config file: the explicit path if given, else
/// `./draftsync.toml`, else the platform config directory.
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    directories::ProjectDirs::from("io", "draftsync", "draftsync")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .filter(|p| p.is_file())
}

/// Convenience wrapper: find and load the config, falling back to defaults
/// when no file exists. An explicit path that does not exist is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    match find_config_file(explicit) {
        Some(path) => load_config_from(&path),
        None => {
            let config = Config::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let api = &config.server.api_url;
    if !(api.starts_with("http://") || api.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "server.api_url".into(),
            message: format!("must be an http(s) URL, got {api:?}"),
        });
    }

    let ws = &config.server.ws_url;
    if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
        return Err(ConfigError::ValidationError {
            field: "server.ws_url".into(),
            message: format!("must be a ws(s) URL, got {ws:?}"),
        });
    }

    let sizes: &[(&str, usize)] = &[
        ("session.channel_capacity", config.session.channel_capacity),
        (
            "session.diagnostics_capacity",
            config.session.diagnostics_capacity,
        ),
    ];
    for (name, val) in sizes {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be greater than 0".into(),
            });
        }
    }

    let r = &config.reconnect;
    if r.initial_backoff_ms == 0 {
        return Err(ConfigError::ValidationError {
            field: "reconnect.initial_backoff_ms".into(),
            message: "must be greater than 0".into(),
        });
    }
    if r.max_backoff_ms < r.initial_backoff_ms {
        return Err(ConfigError::ValidationError {
            field: "reconnect.max_backoff_ms".into(),
            message: format!(
                "must be >= initial_backoff_ms ({}), got {}",
                r.initial_backoff_ms, r.max_backoff_ms
            ),
        });
    }

    Ok(())
}
