// Local configuration for the document engine.
//
// Global config: `~/.docpilot/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::DocsError;

pub const DEFAULT_API_BASE: &str = "https://docs.googleapis.com/v1";
pub const DEFAULT_FILES_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_TOKEN_ENV: &str = "DOCPILOT_ACCESS_TOKEN";

/// Overrides `service.api_base`.
pub const API_BASE_ENV: &str = "DOCPILOT_API_BASE";
/// Overrides `service.files_api_base`.
pub const FILES_API_BASE_ENV: &str = "DOCPILOT_FILES_API_BASE";

/// Root directory for docpilot state: `~/.docpilot/`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".docpilot"))
}

/// Path to the config file: `~/.docpilot/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Configuration at `~/.docpilot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DocpilotConfig {
    pub service: ServiceConfig,
    pub pacing: PacingConfig,
}

/// Where the remote service lives and how to authenticate to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Documents API base URL.
    pub api_base: String,
    /// Files API base URL, used for copies.
    pub files_api_base: String,
    /// Environment variable holding the bearer token. Tokens never live in this file.
    pub token_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            files_api_base: DEFAULT_FILES_API_BASE.into(),
            token_env: DEFAULT_TOKEN_ENV.into(),
            timeout_secs: 30,
        }
    }
}

/// Throttling between remote calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PacingConfig {
    /// Maximum formatting operations per batch.
    pub batch_size: usize,
    /// Delay between formatting batches.
    pub batch_delay_ms: u64,
    /// Delay before each table insertion.
    pub table_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self { batch_size: 50, batch_delay_ms: 100, table_delay_ms: 500 }
    }
}

/// Pacing resolved into the units the sequencer works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub table_delay: Duration,
}

impl Pacing {
    /// No delays; used by tests and the in-memory service.
    pub fn immediate(batch_size: usize) -> Self {
        Self { batch_size, batch_delay: Duration::ZERO, table_delay: Duration::ZERO }
    }
}

impl From<&PacingConfig> for Pacing {
    fn from(config: &PacingConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            table_delay: Duration::from_millis(config.table_delay_ms),
        }
    }
}

impl DocpilotConfig {
    /// Load from `~/.docpilot/config.toml` with environment overrides applied.
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match config_path().filter(|path| path.exists()) {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        Ok(config.with_env_overrides(|name| std::env::var(name).ok()))
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Applies `DOCPILOT_API_BASE` / `DOCPILOT_FILES_API_BASE` from `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup(API_BASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.service.api_base = base;
        }
        if let Some(base) = lookup(FILES_API_BASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.service.files_api_base = base;
        }
        self
    }

    pub fn pacing(&self) -> Pacing {
        Pacing::from(&self.pacing)
    }

    /// Reads the bearer token from the variable named by `service.token_env`.
    pub fn access_token(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, DocsError> {
        lookup(&self.service.token_env)
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| DocsError::MissingToken { variable: self.service.token_env.clone() })
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
