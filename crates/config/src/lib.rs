//! Configuration loading, validation, and management for gymcoach.
//!
//! Loads configuration from `~/.gymcoach/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use gymcoach_core::scope::ScopeSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.gymcoach/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct CoachConfig {
    /// API key for the model provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Provider label used in logs
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Tool-calling loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Context snapshot settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Tool catalog settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Exercise resolution settings
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    1200
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for CoachConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoachConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("context", &self.context)
            .field("tools", &self.tools)
            .field("resolution", &self.resolution)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model round-trips allowed per user turn
    #[serde(default = "default_max_tool_loops")]
    pub max_tool_loops: u32,

    /// Prompt-history window: maximum messages
    #[serde(default = "default_history_max_messages")]
    pub history_max_messages: usize,

    /// Prompt-history window: maximum total characters
    #[serde(default = "default_history_max_chars")]
    pub history_max_chars: usize,

    /// Stream model output by default
    #[serde(default)]
    pub stream: bool,
}

fn default_max_tool_loops() -> u32 {
    2
}
fn default_history_max_messages() -> usize {
    12
}
fn default_history_max_chars() -> usize {
    12_000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_loops: default_max_tool_loops(),
            history_max_messages: default_history_max_messages(),
            history_max_chars: default_history_max_chars(),
            stream: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Scopes shared with the model by default
    #[serde(default = "default_scopes")]
    pub scopes: ScopeSet,

    /// Byte budget for the serialized snapshot
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    #[serde(default)]
    pub limits: ScopeLimits,
}

/// Size of an empty serialized snapshot (`{}`).
pub const MIN_CONTEXT_BYTES: usize = 2;

fn default_scopes() -> ScopeSet {
    ScopeSet::all()
}
fn default_max_bytes() -> usize {
    24_000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            scopes: default_scopes(),
            max_bytes: default_max_bytes(),
            limits: ScopeLimits::default(),
        }
    }
}

/// Per-scope row limits for the snapshot queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeLimits {
    #[serde(default = "default_sessions_limit")]
    pub sessions: usize,
    #[serde(default = "default_templates_limit")]
    pub templates: usize,
    #[serde(default = "default_history_limit")]
    pub exercise_history: usize,
    #[serde(default = "default_notes_limit")]
    pub notes: usize,
}

fn default_sessions_limit() -> usize {
    8
}
fn default_templates_limit() -> usize {
    10
}
fn default_history_limit() -> usize {
    25
}
fn default_notes_limit() -> usize {
    10
}

impl Default for ScopeLimits {
    fn default() -> Self {
        Self {
            sessions: default_sessions_limit(),
            templates: default_templates_limit(),
            exercise_history: default_history_limit(),
            notes: default_notes_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Offer write tools to the model. Calls are still only queued as proposals.
    #[serde(default)]
    pub write_tools_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Minimum fuzzy score for automatic resolution
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Required lead of the top score over the runner-up
    #[serde(default = "default_tie_margin")]
    pub tie_margin: f64,

    /// Minimum score for a name to be offered as a suggestion
    #[serde(default = "default_suggestion_floor")]
    pub suggestion_floor: f64,

    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,

    /// Upper bound on the per-turn candidate pool
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
}

fn default_fuzzy_threshold() -> f64 {
    0.82
}
fn default_tie_margin() -> f64 {
    0.06
}
fn default_suggestion_floor() -> f64 {
    0.45
}
fn default_max_suggestions() -> usize {
    3
}
fn default_candidate_limit() -> usize {
    80
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            tie_margin: default_tie_margin(),
            suggestion_floor: default_suggestion_floor(),
            max_suggestions: default_max_suggestions(),
            candidate_limit: default_candidate_limit(),
        }
    }
}

impl CoachConfig {
    /// Load configuration from the default path (~/.gymcoach/config.toml).
    ///
    /// Environment overrides:
    /// - `GYMCOACH_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `GYMCOACH_MODEL`
    /// - `GYMCOACH_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("GYMCOACH_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("GYMCOACH_MODEL") {
            config.model = model;
        }

        if let Ok(url) = std::env::var("GYMCOACH_API_URL") {
            config.api_url = url;
        }

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

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".gymcoach")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_tool_loops == 0 {
            return Err(ConfigError::ValidationError("agent.max_tool_loops must be >= 1".into()));
        }

        if self.agent.history_max_messages == 0 {
            return Err(ConfigError::ValidationError(
                "agent.history_max_messages must be >= 1".into(),
            ));
        }

        if self.context.max_bytes < MIN_CONTEXT_BYTES {
            return Err(ConfigError::ValidationError(format!(
                "context.max_bytes must be >= {MIN_CONTEXT_BYTES}"
            )));
        }

        let r = &self.resolution;
        for (name, value) in [
            ("fuzzy_threshold", r.fuzzy_threshold),
            ("tie_margin", r.tie_margin),
            ("suggestion_floor", r.suggestion_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "resolution.{name} must be between 0.0 and 1.0"
                )));
            }
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            provider: default_provider(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            context: ContextConfig::default(),
            tools: ToolsConfig::default(),
            resolution: ResolutionConfig::default(),
        }
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
    use gymcoach_core::scope::Scope;

    #[test]
    fn default_config_is_valid() {
        let config = CoachConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.max_tool_loops, 2);
        assert!(!config.tools.write_tools_enabled);
        assert!(config.context.scopes.contains(Scope::Spaces));
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = CoachConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: CoachConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.context.max_bytes, config.context.max_bytes);
        assert_eq!(parsed.context.scopes, config.context.scopes);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = CoachConfig {
            temperature: 5.0,
            ..CoachConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_loops_rejected() {
        let mut config = CoachConfig::default();
        config.agent.max_tool_loops = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn small_context_budget_kept_as_given() {
        let mut config = CoachConfig::default();
        config.context.max_bytes = 300;
        assert!(config.validate().is_ok());
        assert_eq!(config.context.max_bytes, 300);

        config.context.max_bytes = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("context.max_bytes"));
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let mut config = CoachConfig::default();
        config.resolution.tie_margin = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tie_margin"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = CoachConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.provider, "openai");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "gpt-4o"

[context]
scopes = ["sessions", "exerciseHistory"]
max_bytes = 8000

[tools]
write_tools_enabled = true
"#,
        )
        .unwrap();

        let config = CoachConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.context.max_bytes, 8000);
        assert!(config.context.scopes.contains(Scope::ExerciseHistory));
        assert!(!config.context.scopes.contains(Scope::Spaces));
        assert!(config.tools.write_tools_enabled);
        assert_eq!(config.agent.history_max_chars, 12_000);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = CoachConfig {
            api_key: Some("sk-secret".into()),
            ..CoachConfig::default()
        };
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
