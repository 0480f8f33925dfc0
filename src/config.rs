//! Configuration loading and validation.
//!
//! Loads from `$ALMANAC_CONFIG_PATH`, `./almanac.toml`, or
//! `~/.almanac/config.toml`, in that order. Environment variables
//! override file values; file values override defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlmanacConfig {
    /// Completion provider settings.
    pub llm: LlmConfig,
    /// Calendar backend settings.
    pub calendar: CalendarConfig,
    /// Request defaults.
    pub request: RequestConfig,
}

/// Completion provider selection and per-provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Which provider serves completions: `"openai"` or `"ollama"`.
    pub provider: String,
    /// OpenAI settings.
    pub openai: OpenAiConfig,
    /// Ollama settings.
    pub ollama: OllamaConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_owned(),
            openai: OpenAiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// OpenAI completions API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API base URL.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// API key; usually supplied via `OPENAI_API_KEY` instead.
    pub api_key: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_owned(),
            model: "gpt-3.5-turbo-instruct".to_owned(),
            api_key: None,
        }
    }
}

/// Ollama settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Server base URL.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_owned(),
            model: "llama3".to_owned(),
        }
    }
}

/// Calendar backend settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// REST base URL; overridable for test servers.
    pub base_url: String,
    /// Calendar collection to operate on.
    pub calendar_id: String,
    /// Bearer token; usually supplied via `ALMANAC_GOOGLE_TOKEN` instead.
    pub token: Option<String>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: crate::calendar::google::DEFAULT_BASE_URL.to_owned(),
            calendar_id: crate::calendar::google::DEFAULT_CALENDAR_ID.to_owned(),
            token: None,
        }
    }
}

/// Defaults applied to each request context.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Caller's IANA time zone name handed to the extraction prompts.
    pub user_timezone: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            user_timezone: "UTC".to_owned(),
        }
    }
}

impl AlmanacConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a TOML file only, no env overrides.
    fn load_from_file() -> Result<Self> {
        let Some(path) = Self::config_path(|key| std::env::var(key).ok()) else {
            tracing::info!("no config file found, using defaults");
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        tracing::info!(path = %path.display(), "loading config from file");
        let config: AlmanacConfig = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    /// Resolve the config file path, if any exists.
    ///
    /// `$ALMANAC_CONFIG_PATH` wins; then `./almanac.toml`; then
    /// `~/.almanac/config.toml`.
    fn config_path(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
        if let Some(p) = env("ALMANAC_CONFIG_PATH") {
            return Some(PathBuf::from(p));
        }
        let local = PathBuf::from("almanac.toml");
        if local.exists() {
            return Some(local);
        }
        let home = directories::BaseDirs::new()?;
        let user = home.home_dir().join(".almanac").join("config.toml");
        user.exists().then_some(user)
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests avoid mutating process env.
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("ALMANAC_LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Some(v) = env("OPENAI_API_KEY") {
            self.llm.openai.api_key = Some(v);
        }
        if let Some(v) = env("ALMANAC_OPENAI_MODEL") {
            self.llm.openai.model = v;
        }
        if let Some(v) = env("ALMANAC_OLLAMA_URL") {
            self.llm.ollama.base_url = v;
        }
        if let Some(v) = env("ALMANAC_OLLAMA_MODEL") {
            self.llm.ollama.model = v;
        }
        if let Some(v) = env("ALMANAC_GOOGLE_TOKEN") {
            self.calendar.token = Some(v);
        }
        if let Some(v) = env("ALMANAC_CALENDAR_ID") {
            self.calendar.calendar_id = v;
        }
        if let Some(v) = env("ALMANAC_TIMEZONE") {
            self.request.user_timezone = v;
        }
    }
}
