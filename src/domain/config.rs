//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Defines the structs for runtime settings, the platform connection, and logging.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::paths;
use crate::domain::types::{Comparison, SyncMode};

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reads and parses a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Where modules live and how the command set is synchronized.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub commands_path: Option<PathBuf>,
    #[serde(default)]
    pub events_path: Option<PathBuf>,
    #[serde(default)]
    pub validations_path: Option<PathBuf>,
    /// Guilds that receive `dev_only` commands and may invoke them.
    #[serde(default)]
    pub dev_guild_ids: Vec<String>,
    #[serde(default)]
    pub dev_user_ids: Vec<String>,
    #[serde(default)]
    pub dev_role_ids: Vec<String>,
    #[serde(default)]
    pub sync: SyncMode,
    #[serde(default)]
    pub comparison: Comparison,
    #[serde(default)]
    pub skip_builtin_validations: bool,
}

/// Connection settings for the platform's REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct PlatformConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_env: Option<String>, // e.g. "BOT_TOKEN"
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            application_id: String::new(),
            token: None,
            token_env: None,
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl PlatformConfig {
    /// Resolves the bot token, preferring an inline value over the environment.
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        let var = self.token_env.as_deref().unwrap_or("BOT_TOKEN");
        std::env::var(var).with_context(|| format!("Missing environment variable {var}"))
    }
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}
fn default_max_retries() -> usize {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    500
}
fn default_request_timeout() -> u64 {
    10
}

/// Log sinks: a session file that is cleared on start, and the console.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_file")]
    pub file: String,
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_true")]
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file: default_log_file(),
            filter: default_log_filter(),
            console: true,
        }
    }
}

fn default_log_directory() -> String {
    paths::DATA_DIR.to_string()
}
fn default_log_file() -> String {
    "session.log".to_string()
}
fn default_log_filter() -> String {
    "info,reqwest=warn,hyper=warn".to_string()
}
fn default_true() -> bool {
    true
}
