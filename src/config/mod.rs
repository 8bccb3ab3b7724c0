//! Daemon configuration: `config.toml` in the data directory, every field
//! defaulted, overridden by CLI flags / environment variables.

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const DEFAULT_PORT: u16 = 4500;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;

/// Placeholder secret used when none is configured. Tokens signed with it
/// are worthless outside local development, hence the startup warning.
const DEV_JWT_SECRET: &str = "taskd-dev-secret-do-not-use";

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_token_ttl_hours() -> i64 {
    DEFAULT_TOKEN_TTL_HOURS
}

/// Daemon configuration (`config.toml` in the data directory).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TaskdConfig {
    /// REST API port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Data directory for the SQLite database. Empty = platform default.
    pub data_dir: PathBuf,
    /// Log filter (trace, debug, info, warn, error).
    pub log: String,
    /// Server-held secret for signing/verifying bearer tokens.
    /// Empty = dev placeholder (warned at startup).
    pub jwt_secret: String,
    /// Lifetime of issued tokens, in hours.
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for TaskdConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: default_bind_address(),
            data_dir: default_data_dir(),
            log: "info".to_string(),
            jwt_secret: String::new(),
            token_ttl_hours: DEFAULT_TOKEN_TTL_HOURS,
        }
    }
}

impl TaskdConfig {
    /// Load `config.toml` from `data_dir` (or the platform default dir),
    /// then apply CLI/env overrides. A missing file is not an error.
    pub fn load(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        jwt_secret: Option<String>,
        bind_address: Option<String>,
    ) -> Result<Self> {
        let dir = data_dir.clone().unwrap_or_else(default_data_dir);
        let mut config = Self::read_file(&dir.join("config.toml"))?.unwrap_or_default();
        config.data_dir = dir;

        if let Some(p) = port {
            config.port = p;
        }
        if let Some(l) = log {
            config.log = l;
        }
        if let Some(s) = jwt_secret {
            config.jwt_secret = s;
        }
        if let Some(b) = bind_address {
            config.bind_address = b;
        }
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = toml::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(config))
    }

    /// The secret used for token signing. Falls back to a dev-only
    /// placeholder when unconfigured.
    pub fn effective_jwt_secret(&self) -> &str {
        if self.jwt_secret.is_empty() {
            DEV_JWT_SECRET
        } else {
            &self.jwt_secret
        }
    }

    /// Log a warning if the dev placeholder secret is in use.
    pub fn warn_if_dev_secret(&self) {
        if self.jwt_secret.is_empty() {
            warn!("no jwt_secret configured — using the development placeholder; set TASKD_JWT_SECRET in production");
        }
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".taskd");
    }
    PathBuf::from(".taskd")
}
