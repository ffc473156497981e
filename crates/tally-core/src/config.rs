//! Configuration loading
//!
//! Config is loaded with a three-layer resolution:
//! 1. An explicit path (`--config`), or `~/.config/tally/tally.toml` if present
//! 2. Otherwise the embedded defaults (compiled into binary)
//! 3. Environment variables override whatever the file says

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/tally.toml");

/// Top-level `tally.toml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub ai: AiConfig,
    pub server: ServerSettings,
    pub insights: InsightsConfig,
}

/// `[ai]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// `ollama`, `openai_compatible` (aliases `openai`, `vllm`, `localai`) or `mock`
    pub backend: String,
    pub ollama_host: Option<String>,
    pub ollama_model: String,
    pub openai_host: Option<String>,
    pub openai_model: String,
    pub openai_api_key: Option<String>,
    /// Defaults to a backend-appropriate embedding model
    pub embedding_model: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: "ollama".to_string(),
            ollama_host: None,
            ollama_model: "llama3.2".to_string(),
            openai_host: None,
            openai_model: "gpt-3.5-turbo".to_string(),
            openai_api_key: None,
            embedding_model: None,
            timeout_secs: 60,
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub require_auth: bool,
    pub cors_origins: Vec<String>,
    pub static_dir: Option<String>,
    pub token_ttl_hours: i64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            require_auth: true,
            cors_origins: Vec::new(),
            static_dir: None,
            token_ttl_hours: 168,
        }
    }
}

/// `[insights]` section: tuning for the agent's heuristics
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    pub recent_transactions: usize,
    pub anomaly_std_devs: f64,
    pub budget_warning_percent: f64,
    pub search_limit: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            recent_transactions: 20,
            anomaly_std_devs: 2.0,
            budget_warning_percent: 80.0,
            search_limit: 10,
        }
    }
}

/// Default user config path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tally").join("tally.toml"))
}

impl TallyConfig {
    /// Load config from a file (or the defaults) and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(default_path) => {
                    debug!(path = %default_path.display(), "Loading user config");
                    fs::read_to_string(&default_path).map_err(|e| {
                        Error::Config(format!("Failed to read {}: {}", default_path.display(), e))
                    })?
                }
                None => DEFAULT_CONFIG.to_string(),
            },
        };

        let mut config = Self::parse(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Parse TOML content without environment overrides
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))
    }

    /// Apply process environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (environment or a test map)
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AI_BACKEND") {
            self.ai.backend = v;
        }
        if let Some(v) = get("OLLAMA_HOST") {
            self.ai.ollama_host = Some(v);
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            self.ai.ollama_model = v;
        }
        if let Some(v) = get("OPENAI_COMPATIBLE_HOST") {
            self.ai.openai_host = Some(v);
        }
        if let Some(v) = get("OPENAI_COMPATIBLE_MODEL") {
            self.ai.openai_model = v;
        }
        if let Some(v) = get("OPENAI_COMPATIBLE_API_KEY") {
            self.ai.openai_api_key = Some(v);
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.ai.embedding_model = Some(v);
        }
        if let Some(v) = get("TALLY_HOST") {
            self.server.host = v;
        }
        if let Some(port) = get("TALLY_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
    }
}
