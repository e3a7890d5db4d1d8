//! TOML-based application configuration.
//!
//! Stores tunables for:
//! - Signal collection (timeouts, concurrency, feed cap, API bases)
//! - The nudge panel
//! - The AI assistant endpoint and model
//!
//! Configuration is stored at `~/.config/upkeep/config.toml`. Secrets
//! never live here: platform tokens go to the OS keyring and the
//! assistant key comes from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::assistant;
use crate::error::ConfigError;
use crate::platforms::{github, twitch, youtube};

/// Signal collection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Concurrent per-channel/per-user sub-fetches within one platform.
    #[serde(default = "default_subfetch_concurrency")]
    pub subfetch_concurrency: usize,
    /// Cap on the merged feed.
    #[serde(default = "default_max_signals")]
    pub max_signals: usize,
    #[serde(default = "default_youtube_api_base")]
    pub youtube_api_base: String,
    #[serde(default = "default_github_api_base")]
    pub github_api_base: String,
    #[serde(default = "default_twitch_api_base")]
    pub twitch_api_base: String,
}

/// Nudge panel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgesConfig {
    /// How many nudges the panel shows at once.
    #[serde(default = "default_panel_limit")]
    pub panel_limit: usize,
}

/// AI assistant configuration. The API key comes from the
/// `OPENAI_API_KEY` environment variable, never from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_api_base")]
    pub api_base: String,
    #[serde(default = "default_assistant_model")]
    pub model: String,
    #[serde(default = "default_assistant_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/upkeep/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub nudges: NudgesConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

// Default functions
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_subfetch_concurrency() -> usize {
    4
}
fn default_max_signals() -> usize {
    100
}
fn default_youtube_api_base() -> String {
    youtube::DEFAULT_API_BASE.to_string()
}
fn default_github_api_base() -> String {
    github::DEFAULT_API_BASE.to_string()
}
fn default_twitch_api_base() -> String {
    twitch::DEFAULT_API_BASE.to_string()
}
fn default_panel_limit() -> usize {
    crate::nudge::DEFAULT_PANEL_LIMIT
}
fn default_assistant_api_base() -> String {
    assistant::DEFAULT_API_BASE.to_string()
}
fn default_assistant_model() -> String {
    assistant::DEFAULT_MODEL.to_string()
}
fn default_assistant_timeout_secs() -> u64 {
    30
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            subfetch_concurrency: default_subfetch_concurrency(),
            max_signals: default_max_signals(),
            youtube_api_base: default_youtube_api_base(),
            github_api_base: default_github_api_base(),
            twitch_api_base: default_twitch_api_base(),
        }
    }
}

impl Default for NudgesConfig {
    fn default() -> Self {
        Self {
            panel_limit: default_panel_limit(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_base: default_assistant_api_base(),
            model: default_assistant_model(),
            request_timeout_secs: default_assistant_timeout_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            nudges: NudgesConfig::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::Invalid("config key is empty".into()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::Invalid(format!("unknown config key: {key}")))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::Invalid(format!("unknown config key: {key}")))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| ConfigError::Invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    ConfigError::Invalid(format!(
                                        "cannot parse '{value}' as number"
                                    ))
                                })?
                        } else {
                            return Err(ConfigError::Invalid(format!(
                                "cannot parse '{value}' as number"
                            )));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value)
                            .map_err(|e| ConfigError::Invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown config key: {key}")))?;
        }

        Err(ConfigError::Invalid(format!("unknown config key: {key}")))
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key and persist. Returns an error if the
    /// key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.save()?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.feed.request_timeout_secs, 10);
        assert_eq!(parsed.feed.subfetch_concurrency, 4);
        assert_eq!(parsed.feed.max_signals, 100);
        assert_eq!(parsed.nudges.panel_limit, 3);
    }

    #[test]
    fn default_api_bases_point_at_providers() {
        let cfg = Config::default();
        assert_eq!(
            cfg.feed.youtube_api_base,
            "https://www.googleapis.com/youtube/v3"
        );
        assert_eq!(cfg.feed.github_api_base, "https://api.github.com");
        assert_eq!(cfg.feed.twitch_api_base, "https://api.twitch.tv/helix");
        assert_eq!(cfg.assistant.api_base, "https://api.openai.com/v1");
        assert_eq!(cfg.assistant.model, "gpt-4-turbo-preview");
    }

    #[test]
    fn partial_file_fills_missing_fields_with_defaults() {
        let parsed: Config = toml::from_str(
            "[feed]\nmax_signals = 25\n\n[nudges]\npanel_limit = 5\n",
        )
        .unwrap();
        assert_eq!(parsed.feed.max_signals, 25);
        assert_eq!(parsed.feed.request_timeout_secs, 10);
        assert_eq!(parsed.nudges.panel_limit, 5);
        assert_eq!(parsed.assistant.model, "gpt-4-turbo-preview");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("feed.max_signals").as_deref(), Some("100"));
        assert_eq!(cfg.get("nudges.panel_limit").as_deref(), Some("3"));
        assert!(cfg.get("feed.missing_key").is_none());
    }

    #[test]
    fn set_json_value_by_path_updates_nested_number() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "feed.max_signals", "40").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "feed.max_signals").unwrap(),
            &serde_json::Value::Number(40.into())
        );
    }

    #[test]
    fn set_json_value_by_path_updates_nested_string() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "assistant.model", "gpt-4o").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "assistant.model").unwrap(),
            &serde_json::Value::String("gpt-4o".to_string())
        );
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "feed.nonexistent_key", "value");
        assert!(result.is_err());
    }

    #[test]
    fn set_json_value_by_path_rejects_invalid_number() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "feed.max_signals", "a lot");
        assert!(result.is_err());
    }
}
