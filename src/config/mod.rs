use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;
const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
const DEFAULT_CONNECT_BACKOFF_MS: u64 = 2000;
const DEFAULT_WORK_DELAY_SECS: u64 = 180;

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

// ─── ServerConfig ────────────────────────────────────────────────────────────

/// HTTP server configuration (`[server]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Use `0.0.0.0` to accept non-local connections.
    pub bind_address: String,
    /// How long shutdown waits for in-flight requests before giving up.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: default_bind_address(),
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }
}

// ─── DatabaseConfig ──────────────────────────────────────────────────────────

/// Store connect behavior at startup (`[database]` in config.toml).
/// Connectivity must be established before the server binds; the process
/// retries `connect_attempts` times with a fixed `connect_backoff_ms` delay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub connect_attempts: u32,
    pub connect_backoff_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_backoff_ms: DEFAULT_CONNECT_BACKOFF_MS,
        }
    }
}

// ─── WorkConfig ──────────────────────────────────────────────────────────────

/// Behavior of the built-in demo work function (`[work]` in config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkConfig {
    /// Seconds the demo work function sleeps before returning its payload.
    pub delay_secs: u64,
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            delay_secs: DEFAULT_WORK_DELAY_SECS,
        }
    }
}

// ─── AppConfig ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub work: WorkConfig,
}

impl AppConfig {
    /// Load config.toml from `path` if given. A missing or unreadable file
    /// is a warning, not an error — defaults apply. CLI flags and env vars
    /// override individual values on top of this (handled in main).
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        match std::fs::read_to_string(path) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), err = %e, "invalid config file — using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), err = %e, "could not read config file — using defaults");
                Self::default()
            }
        }
    }
}
