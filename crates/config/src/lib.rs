//! Configuration loading, validation, and management for chatplug.
//!
//! Loads configuration from `~/.chatplug/config.toml` with environment
//! variable overrides. Each section holds the tunable values ("valves")
//! of one filter or tool.

use chatplug_core::filter::RewriteStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.chatplug/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Memory injection filter
    #[serde(default)]
    pub memory_injection: MemoryInjectionConfig,

    /// Reasoning timer filter
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Tool-call formatting filter
    #[serde(default)]
    pub tool_call_format: ToolCallFormatConfig,

    /// Web search tool
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Memory editing tools
    #[serde(default)]
    pub remember: RememberConfig,
}

pub const DEFAULT_PREPENDING_TEXT: &str = "\n\nThe following is a list of stored memories, which are information related to the user, but are not part of this conversation. Consider the information within these memories as factual and use them to inform your responses, but do not bring up information from the memory bank unless it is directly related to the current conversation. Do not make up memories if the provided memory bank is empty. This is the list of memories: ";

/// Upper bound on results the web search tool returns per query.
pub const MAX_RESULTS_PER_QUERY: u32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryInjectionConfig {
    /// Text placed before the JSON list of memories
    #[serde(default = "default_prepending_text")]
    pub prepending_text: String,

    /// Emit a status event with the number of memories found
    #[serde(default)]
    pub show_memory_count: bool,

    /// Inject the preamble and an empty list even when the user has no memories
    #[serde(default = "default_true")]
    pub append_on_empty: bool,
}

fn default_prepending_text() -> String {
    DEFAULT_PREPENDING_TEXT.into()
}
fn default_true() -> bool {
    true
}

impl Default for MemoryInjectionConfig {
    fn default() -> Self {
        Self {
            prepending_text: default_prepending_text(),
            show_memory_count: false,
            append_on_empty: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Status shown while waiting for the first chunk
    #[serde(default = "default_reasoning_text")]
    pub reasoning_text: String,
}

fn default_reasoning_text() -> String {
    "Thinking...".into()
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            reasoning_text: default_reasoning_text(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFormatConfig {
    /// strip | summarize | annotate
    #[serde(default)]
    pub strategy: RewriteStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Base URL of the SearXNG instance
    #[serde(default = "default_searxng_url")]
    pub searxng_url: String,

    #[serde(default)]
    pub safesearch: bool,

    /// Per-query HTTP timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Cap applied to the model's requested result count
    #[serde(default = "default_max_results")]
    pub max_results_per_query: u32,
}

fn default_searxng_url() -> String {
    "http://localhost:8080".into()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_max_results() -> u32 {
    MAX_RESULTS_PER_QUERY
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            searxng_url: default_searxng_url(),
            safesearch: false,
            timeout_secs: default_timeout_secs(),
            max_results_per_query: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RememberConfig {
    /// Return the updated memory bank to the model after each change
    #[serde(default)]
    pub include_memory_list: bool,
}

impl AppConfig {
    /// Load configuration from the default path (~/.chatplug/config.toml).
    ///
    /// Environment variables override file values:
    /// - `CHATPLUG_SEARXNG_URL`
    /// - `CHATPLUG_SAFESEARCH` (`1`/`true`/`yes`/`on`)
    /// - `CHATPLUG_TOOL_CALL_STRATEGY`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup("CHATPLUG_SEARXNG_URL") {
            self.lookup.searxng_url = url;
        }

        if let Some(flag) = lookup("CHATPLUG_SAFESEARCH") {
            self.lookup.safesearch = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Some(strategy) = lookup("CHATPLUG_TOOL_CALL_STRATEGY") {
            self.tool_call_format.strategy =
                strategy.parse().map_err(ConfigError::ValidationError)?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatplug")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.lookup.searxng_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "lookup.searxng_url must start with http:// or https:// (got '{url}')"
            )));
        }

        if self.lookup.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "lookup.timeout_secs must be > 0".into(),
            ));
        }

        if !(1..=MAX_RESULTS_PER_QUERY).contains(&self.lookup.max_results_per_query) {
            return Err(ConfigError::ValidationError(format!(
                "lookup.max_results_per_query must be between 1 and {MAX_RESULTS_PER_QUERY}"
            )));
        }

        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        Self::default().to_toml().unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lookup.searxng_url, "http://localhost:8080");
        assert_eq!(config.lookup.timeout_secs, 20);
        assert_eq!(config.reasoning.reasoning_text, "Thinking...");
        assert_eq!(config.tool_call_format.strategy, RewriteStrategy::Summarize);
        assert!(config.memory_injection.append_on_empty);
        assert!(!config.remember.include_memory_list);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[tool_call_format]
strategy = "strip"

[lookup]
searxng_url = "https://search.example.org"
safesearch = true
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.tool_call_format.strategy, RewriteStrategy::Strip);
        assert_eq!(config.lookup.searxng_url, "https://search.example.org");
        assert!(config.lookup.safesearch);
        assert_eq!(config.lookup.max_results_per_query, 8);
        assert_eq!(config.memory_injection.prepending_text, DEFAULT_PREPENDING_TEXT);
    }

    #[test]
    fn unknown_strategy_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tool_call_format]\nstrategy = \"erase\"\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn invalid_url_rejected() {
        let mut config = AppConfig::default();
        config.lookup.searxng_url = "localhost:8080".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_result_cap_rejected() {
        let mut config = AppConfig::default();
        config.lookup.max_results_per_query = 0;
        assert!(config.validate().is_err());
        config.lookup.max_results_per_query = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CHATPLUG_SEARXNG_URL", "http://10.0.0.5:8888"),
            ("CHATPLUG_SAFESEARCH", "Yes"),
            ("CHATPLUG_TOOL_CALL_STRATEGY", "annotate"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.lookup.searxng_url, "http://10.0.0.5:8888");
        assert!(config.lookup.safesearch);
        assert_eq!(config.tool_call_format.strategy, RewriteStrategy::Annotate);
    }

    #[test]
    fn bad_strategy_override_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "CHATPLUG_TOOL_CALL_STRATEGY").then(|| "shout".to_string())
        });
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("summarize"));
        assert!(toml_str.contains("localhost:8080"));
    }
}
