//! Bootstrap configuration loading and secret resolution
//!
//! Configuration is resolved in priority order:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing TOML file is not an error: the service logs a warning and
//! starts with built-in defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "INTEL_SYNTH_CONFIG";

/// Directory name under the platform config dir
const CONFIG_DIR_NAME: &str = "intel-synth";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub pipeline: PipelineTuning,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Plain completion service (extraction and rendering)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_small_model")]
    pub extraction_model: String,
    #[serde(default = "default_small_model")]
    pub render_model: String,
    /// Ordered model cascade for long-form renderers, most capable first
    #[serde(default = "default_long_form_models")]
    pub long_form_models: Vec<String>,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_completion_rps")]
    pub requests_per_second: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_url(),
            api_key: None,
            extraction_model: default_small_model(),
            render_model: default_small_model(),
            long_form_models: default_long_form_models(),
            timeout_secs: default_completion_timeout(),
            requests_per_second: default_completion_rps(),
        }
    }
}

/// Search-augmented completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_search_model")]
    pub model: String,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_search_rps")]
    pub requests_per_second: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_url(),
            api_key: None,
            model: default_search_model(),
            timeout_secs: default_search_timeout(),
            requests_per_second: default_search_rps(),
        }
    }
}

/// Speech synthesis service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_speech_timeout")]
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: default_speech_url(),
            api_key: None,
            timeout_secs: default_speech_timeout(),
        }
    }
}

/// Search fan-out tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineTuning {
    /// Upper bound on concurrently running search tasks
    #[serde(default = "default_max_concurrent_searches")]
    pub max_concurrent_searches: usize,
    /// Per-task timeout; a hung search becomes a failed outcome
    #[serde(default = "default_search_task_timeout")]
    pub search_timeout_secs: u64,
    /// Truncate extracted queries to the requested count
    #[serde(default = "default_true")]
    pub clamp_query_count: bool,
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            max_concurrent_searches: default_max_concurrent_searches(),
            search_timeout_secs: default_search_task_timeout(),
            clamp_query_count: true,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5790
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_completion_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_small_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_long_form_models() -> Vec<String> {
    vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()]
}

fn default_completion_timeout() -> u64 {
    120
}

fn default_completion_rps() -> u32 {
    10
}

fn default_search_url() -> String {
    "https://api.perplexity.ai".to_string()
}

fn default_search_model() -> String {
    "sonar".to_string()
}

fn default_search_timeout() -> u64 {
    60
}

fn default_search_rps() -> u32 {
    5
}

fn default_speech_url() -> String {
    "http://127.0.0.1:5791".to_string()
}

fn default_speech_timeout() -> u64 {
    180
}

fn default_max_concurrent_searches() -> usize {
    8
}

fn default_search_task_timeout() -> u64 {
    45
}

fn default_true() -> bool {
    true
}

/// Resolve which config file to read
///
/// Priority: CLI argument → `INTEL_SYNTH_CONFIG` → platform config dir.
/// Returns `None` when nothing is configured and no default file exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join(CONFIG_DIR_NAME).join("config.toml"))
        .filter(|p| p.exists())
}

/// Load TOML configuration, falling back to defaults when the file is absent
///
/// A file that exists but fails to parse is an error: silently ignoring a
/// typo would hide misconfigured credentials.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        info!("No config file found, using built-in defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve a secret from environment, then TOML
///
/// Blank values count as absent. Warns when both sources carry a value.
pub fn resolve_secret(name: &str, env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in both environment and TOML. Using environment (highest priority).",
            name
        );
    }

    if let Some(key) = env_value {
        info!("{} loaded from environment variable {}", name, env_var);
        return Some(key);
    }

    if let Some(key) = toml_value {
        info!("{} loaded from TOML config", name);
        return Some(key.to_string());
    }

    warn!("{} not configured (set {} or the TOML api_key)", name, env_var);
    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
