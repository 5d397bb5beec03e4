//! Assistant configuration.
//!
//! # Responsibility
//! - Load `AssistantConfig` from TOML, apply environment overrides and
//!   validate the result.
//! - Derive `DispatchSettings` and adapter options from it.
//!
//! # Invariants
//! - Every field has a default; an empty file is a valid configuration.
//! - `validate` runs after overrides, so env values are checked too.
//! - `api_key` is never included in `Debug` output or error messages.

use crate::classifier::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::document::notion::{DEFAULT_NOTION_API_URL, DEFAULT_NOTION_VERSION};
use crate::document::RetryPolicy;
use crate::section::DEFAULT_MAX_SECTION_DEPTH;
use crate::service::DispatchSettings;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_NOTION_API_KEY: &str = "NOTION_API_KEY";
pub const ENV_NOTION_PAGE_ID: &str = "NOTION_PAGE_ID";
pub const ENV_NOTION_API_URL: &str = "NOTION_API_URL";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "LUNA_CONFIDENCE_THRESHOLD";
pub const ENV_INTENTS_PATH: &str = "LUNA_INTENTS_PATH";

/// Configuration failures.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(String),
    InvalidValue {
        field: &'static str,
        message: String,
    },
    /// Required value absent for the requested operation.
    Missing(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(message) => write!(f, "invalid config: {message}"),
            Self::InvalidValue { field, message } => {
                write!(f, "invalid value for `{field}`: {message}")
            }
            Self::Missing(field) => write!(f, "missing required config value `{field}`"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Top-level configuration file shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssistantConfig {
    pub confidence_threshold: f64,
    pub max_section_depth: usize,
    pub request_timeout_ms: u64,
    pub notion: NotionConfig,
    pub classifier: ClassifierConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_section_depth: DEFAULT_MAX_SECTION_DEPTH,
            request_timeout_ms: 30_000,
            notion: NotionConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

/// `[notion]` table.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotionConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub page_id: Option<String>,
    pub notion_version: String,
    pub fetch_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_NOTION_API_URL.to_string(),
            api_key: None,
            page_id: None,
            notion_version: DEFAULT_NOTION_VERSION.to_string(),
            fetch_retries: 3,
            retry_backoff_ms: 200,
        }
    }
}

impl Debug for NotionConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("page_id", &self.page_id)
            .field("notion_version", &self.notion_version)
            .field("fetch_retries", &self.fetch_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

impl NotionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.fetch_retries,
            initial_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        non_blank(self.api_key.as_deref()).ok_or(ConfigError::Missing("notion.api_key"))
    }

    pub fn require_page_id(&self) -> Result<&str, ConfigError> {
        non_blank(self.page_id.as_deref()).ok_or(ConfigError::Missing("notion.page_id"))
    }
}

/// `[classifier]` table. `remote_url` takes precedence over `intents_path`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    pub intents_path: Option<PathBuf>,
    pub remote_url: Option<String>,
}

impl AssistantConfig {
    /// Loads the file at `path` (defaults when `None`), applies process
    /// environment overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses TOML without applying overrides or validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies overrides from `lookup`; blank values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value_of = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = value_of(ENV_NOTION_API_KEY) {
            self.notion.api_key = Some(value);
        }
        if let Some(value) = value_of(ENV_NOTION_PAGE_ID) {
            self.notion.page_id = Some(value);
        }
        if let Some(value) = value_of(ENV_NOTION_API_URL) {
            self.notion.api_url = value;
        }
        if let Some(value) = value_of(ENV_INTENTS_PATH) {
            self.classifier.intents_path = Some(PathBuf::from(value));
        }
        if let Some(value) = value_of(ENV_CONFIDENCE_THRESHOLD) {
            self.confidence_threshold =
                value
                    .trim()
                    .parse::<f64>()
                    .map_err(|err| ConfigError::InvalidValue {
                        field: "confidence_threshold",
                        message: format!("{ENV_CONFIDENCE_THRESHOLD}: {err}"),
                    })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "confidence_threshold",
                message: format!("{} is outside [0, 1]", self.confidence_threshold),
            });
        }
        if self.max_section_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_section_depth",
                message: "must be at least 1".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.notion.fetch_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "notion.fetch_retries",
                message: "must be at least 1".to_string(),
            });
        }
        if self.notion.api_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "notion.api_url",
                message: "must not be blank".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            confidence_threshold: self.confidence_threshold,
            max_section_depth: self.max_section_depth,
            request_timeout: Some(self.request_timeout()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{AssistantConfig, ConfigError};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = AssistantConfig::from_toml_str("").expect("parse empty");
        assert_eq!(config, AssistantConfig::default());
        assert_eq!(config.confidence_threshold, 0.85);
        assert_eq!(config.max_section_depth, 32);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn parses_tables_and_derives_settings() {
        let config = AssistantConfig::from_toml_str(
            r#"
confidence_threshold = 0.7
request_timeout_ms = 1500

[notion]
page_id = "page-1"
fetch_retries = 5
retry_backoff_ms = 50

[classifier]
intents_path = "data/intents.json"
"#,
        )
        .expect("parse config");

        let settings = config.dispatch_settings();
        assert_eq!(settings.confidence_threshold, 0.7);
        assert_eq!(settings.request_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.notion.require_page_id().expect("page id"), "page-1");
        assert_eq!(config.notion.retry_policy().max_attempts, 5);
        assert_eq!(
            config.classifier.intents_path,
            Some(PathBuf::from("data/intents.json"))
        );
        assert!(matches!(
            config.notion.require_api_key(),
            Err(ConfigError::Missing("notion.api_key"))
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = AssistantConfig::from_toml_str("threshold = 0.5").expect_err("unknown key");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_win_and_are_validated() {
        let mut config = AssistantConfig::default();
        config
            .apply_env_overrides(env(&[
                ("NOTION_API_KEY", "secret"),
                ("NOTION_PAGE_ID", "page-9"),
                ("LUNA_CONFIDENCE_THRESHOLD", "0.9"),
                ("NOTION_API_URL", "  "),
            ]))
            .expect("apply overrides");
        assert_eq!(config.notion.require_api_key().expect("key"), "secret");
        assert_eq!(config.confidence_threshold, 0.9);
        assert_eq!(config.notion.api_url, "https://api.notion.com/v1");
        assert!(!format!("{config:?}").contains("secret"));

        config
            .apply_env_overrides(env(&[("LUNA_CONFIDENCE_THRESHOLD", "1.5")]))
            .expect("parseable");
        let err = config.validate().expect_err("out of range");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "confidence_threshold",
                ..
            }
        ));

        let err = config
            .apply_env_overrides(env(&[("LUNA_CONFIDENCE_THRESHOLD", "high")]))
            .expect_err("not a number");
        assert!(err.to_string().contains("confidence_threshold"));
    }

    #[test]
    fn zero_limits_are_invalid() {
        let mut config = AssistantConfig::default();
        config.max_section_depth = 0;
        assert!(config.validate().is_err());

        let mut config = AssistantConfig::default();
        config.request_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AssistantConfig::default();
        config.notion.fetch_retries = 0;
        assert!(config.validate().is_err());
    }
}
