use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_REFERENCE_CLASSIFIER_URL: &str = "http://localhost:5001";
pub const DEFAULT_REFERENCE_TIMEOUT_MS: u64 = 10_000;

const CONFIG_FILE_PATH: &str = "diagnosis.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GOOGLE_GENERATIVE_AI_API_KEY environment variable is required")]
    MissingApiKey,

    #[error("invalid URL for {name}: '{value}'")]
    InvalidUrl { name: &'static str, value: String },

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Settings consumed by the diagnosis pipeline. Loaded once at startup.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub reference_classifier_url: String,
    pub reference_classifier_enabled: bool,
    pub reference_timeout_ms: u64,
}

// Hand-written so the API key never ends up in logs.
impl std::fmt::Debug for DiagnosisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosisConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("reference_classifier_url", &self.reference_classifier_url)
            .field(
                "reference_classifier_enabled",
                &self.reference_classifier_enabled,
            )
            .field("reference_timeout_ms", &self.reference_timeout_ms)
            .finish()
    }
}

fn parse_bool_env(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            reference_classifier_url: DEFAULT_REFERENCE_CLASSIFIER_URL.to_string(),
            reference_classifier_enabled: true,
            reference_timeout_ms: DEFAULT_REFERENCE_TIMEOUT_MS,
        }
    }
}

impl DiagnosisConfig {
    /// Defaults, then `diagnosis.toml` if present, then environment variables.
    pub fn new() -> Self {
        let mut config = Self::from_file(Path::new(CONFIG_FILE_PATH)).unwrap_or_default();
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    fn from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                log::warn!("Failed to read {}: {}", path.display(), err);
                return None;
            }
        };
        match toml::from_str::<DiagnosisConfig>(&content) {
            Ok(config) => Some(config),
            Err(err) => {
                log::warn!("Failed to parse {}: {}", path.display(), err);
                None
            }
        }
    }

    /// Apply `GOOGLE_GENERATIVE_AI_API_KEY`, `GEMINI_API_BASE`, `GEMINI_MODEL`,
    /// `REFERENCE_CLASSIFIER_URL`, `REFERENCE_CLASSIFIER_ENABLED` and
    /// `REFERENCE_CLASSIFIER_TIMEOUT_MS` from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_key) = lookup("GOOGLE_GENERATIVE_AI_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Some(api_base) = lookup("GEMINI_API_BASE") {
            self.api_base = api_base;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("REFERENCE_CLASSIFIER_URL") {
            self.reference_classifier_url = url;
        }
        if let Some(enabled) = lookup("REFERENCE_CLASSIFIER_ENABLED") {
            self.reference_classifier_enabled = parse_bool_env(&enabled);
        }
        if let Some(timeout) = lookup("REFERENCE_CLASSIFIER_TIMEOUT_MS") {
            match timeout.trim().parse() {
                Ok(ms) => self.reference_timeout_ms = ms,
                Err(_) => log::warn!(
                    "Ignoring REFERENCE_CLASSIFIER_TIMEOUT_MS='{}', keeping {}ms",
                    timeout,
                    self.reference_timeout_ms
                ),
            }
        }
    }

    pub fn reference_timeout(&self) -> Duration {
        Duration::from_millis(self.reference_timeout_ms)
    }

    /// Check everything the pipeline needs and return the API key.
    pub fn validate(&self) -> Result<&str, ConfigError> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        check_url("GEMINI_API_BASE", &self.api_base)?;
        if self.reference_classifier_enabled {
            check_url("REFERENCE_CLASSIFIER_URL", &self.reference_classifier_url)?;
            if self.reference_timeout_ms == 0 {
                return Err(ConfigError::InvalidValue {
                    name: "REFERENCE_CLASSIFIER_TIMEOUT_MS",
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "GEMINI_MODEL",
                reason: "must not be empty".to_string(),
            });
        }

        Ok(api_key)
    }
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ConfigError::InvalidUrl {
            name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_env(pairs: &[(&str, &str)]) -> DiagnosisConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = DiagnosisConfig::default();
        config.apply_overrides(|name| env.get(name).cloned());
        config
    }

    #[test]
    fn parse_bool_env_values() {
        for value in ["1", "true", "TRUE", " yes ", "Y", "on"] {
            assert!(parse_bool_env(value), "value {value:?} should be true");
        }
        for value in ["0", "false", "no", "off", "", "  "] {
            assert!(!parse_bool_env(value), "value {value:?} should be false");
        }
    }

    #[test]
    fn defaults() {
        let config = DiagnosisConfig::default();
        assert_eq!(config.api_key, None);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.reference_classifier_url, DEFAULT_REFERENCE_CLASSIFIER_URL);
        assert!(config.reference_classifier_enabled);
        assert_eq!(config.reference_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn env_overrides() {
        let config = with_env(&[
            ("GOOGLE_GENERATIVE_AI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-test"),
            ("REFERENCE_CLASSIFIER_URL", "http://classifier:5001"),
            ("REFERENCE_CLASSIFIER_ENABLED", "off"),
            ("REFERENCE_CLASSIFIER_TIMEOUT_MS", "250"),
        ]);

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.model, "gemini-test");
        assert_eq!(config.reference_classifier_url, "http://classifier:5001");
        assert!(!config.reference_classifier_enabled);
        assert_eq!(config.reference_timeout_ms, 250);
    }

    #[test]
    fn bad_timeout_is_ignored() {
        let config = with_env(&[("REFERENCE_CLASSIFIER_TIMEOUT_MS", "soon")]);
        assert_eq!(config.reference_timeout_ms, DEFAULT_REFERENCE_TIMEOUT_MS);
    }

    #[test]
    fn missing_or_blank_api_key_is_rejected() {
        assert!(matches!(
            DiagnosisConfig::default().validate(),
            Err(ConfigError::MissingApiKey)
        ));
        let blank = with_env(&[("GOOGLE_GENERATIVE_AI_API_KEY", "   ")]);
        assert!(matches!(blank.validate(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn invalid_classifier_url_is_rejected() {
        let config = with_env(&[
            ("GOOGLE_GENERATIVE_AI_API_KEY", "secret"),
            ("REFERENCE_CLASSIFIER_URL", "localhost:5001"),
        ]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { name: "REFERENCE_CLASSIFIER_URL", .. })
        ));
    }

    #[test]
    fn disabled_classifier_url_is_not_checked() {
        let config = with_env(&[
            ("GOOGLE_GENERATIVE_AI_API_KEY", "secret"),
            ("REFERENCE_CLASSIFIER_URL", "not a url"),
            ("REFERENCE_CLASSIFIER_ENABLED", "false"),
        ]);
        assert_eq!(config.validate().unwrap(), "secret");
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = with_env(&[("GOOGLE_GENERATIVE_AI_API_KEY", "secret")]);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn parses_toml_file() {
        let config: DiagnosisConfig = toml::from_str(
            r#"
            model = "gemini-from-file"
            reference_classifier_enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.model, "gemini-from-file");
        assert!(!config.reference_classifier_enabled);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }
}
