//! Configuration loading.
//!
//! Config comes from three places, in priority order: an explicit TOML
//! file, environment variable discovery, and the stub default. The CLI
//! wires those together; the library only knows how to load each source.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CuratorError;
use crate::llm::{LlmProviderConfig, LlmProviderType};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AisleConfig {
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Provider section of the config file.
///
/// Mirrors [`LlmProviderConfig`] but with the provider type as a plain
/// string so the TOML stays readable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub timeout_seconds: Option<u64>,
}

fn default_provider() -> String {
    "stub".to_string()
}

fn default_model() -> String {
    "stub-model".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            max_tokens: None,
            temperature: None,
            timeout_seconds: None,
        }
    }
}

impl AisleConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CuratorError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CuratorError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            CuratorError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Discover a provider from the environment.
    ///
    /// Checks `OPENAI_API_KEY`, then `ANTHROPIC_API_KEY`, then
    /// `AISLE_INFERENCE_URL`. Returns `None` when nothing is set, which the
    /// caller typically maps to the stub provider.
    pub fn from_env() -> Option<Self> {
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            return Some(Self {
                llm: LlmConfig {
                    provider: "openai".to_string(),
                    model: std::env::var("OPENAI_MODEL")
                        .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                    api_key: Some(api_key),
                    base_url: std::env::var("OPENAI_BASE_URL").ok(),
                    ..LlmConfig::default()
                },
            });
        }
        if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
            return Some(Self {
                llm: LlmConfig {
                    provider: "anthropic".to_string(),
                    model: std::env::var("ANTHROPIC_MODEL")
                        .unwrap_or_else(|_| "claude-3-haiku-20240307".to_string()),
                    api_key: Some(api_key),
                    ..LlmConfig::default()
                },
            });
        }
        if let Ok(base_url) = std::env::var("AISLE_INFERENCE_URL") {
            return Some(Self {
                llm: LlmConfig {
                    provider: "hosted".to_string(),
                    model: std::env::var("AISLE_INFERENCE_MODEL").unwrap_or_default(),
                    base_url: Some(base_url),
                    ..LlmConfig::default()
                },
            });
        }
        None
    }

    /// Convert into a provider configuration.
    pub fn to_provider_config(&self) -> Result<LlmProviderConfig, CuratorError> {
        let provider_type: LlmProviderType = self.llm.provider.parse()?;
        let defaults = LlmProviderConfig::default();
        Ok(LlmProviderConfig {
            provider_type,
            model: self.llm.model.clone(),
            api_key: self.llm.api_key.clone(),
            base_url: self.llm.base_url.clone(),
            max_tokens: self.llm.max_tokens.or(defaults.max_tokens),
            temperature: self.llm.temperature.or(defaults.temperature),
            timeout_seconds: self.llm.timeout_seconds.or(defaults.timeout_seconds),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_to_stub() {
        let config = AisleConfig::default();
        let provider = config.to_provider_config().unwrap();
        assert_eq!(provider.provider_type, LlmProviderType::Stub);
        assert_eq!(provider.model, "stub-model");
    }

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[llm]
provider = "openai"
model = "gpt-4o"
api_key = "sk-test"
temperature = 0.2
"#
        )
        .unwrap();

        let config = AisleConfig::from_file(file.path()).unwrap();
        let provider = config.to_provider_config().unwrap();
        assert_eq!(provider.provider_type, LlmProviderType::OpenAi);
        assert_eq!(provider.model, "gpt-4o");
        assert_eq!(provider.api_key.as_deref(), Some("sk-test"));
        assert_eq!(provider.temperature, Some(0.2));
        // Unset fields take the provider defaults.
        assert_eq!(provider.timeout_seconds, Some(30));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = AisleConfig::from_file("/nonexistent/aisle.toml").unwrap_err();
        assert!(matches!(err, CuratorError::Config(_)));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not [valid toml").unwrap();
        let err = AisleConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, CuratorError::Config(_)));
    }

    #[test]
    fn unknown_provider_name_is_rejected() {
        let config = AisleConfig {
            llm: LlmConfig {
                provider: "mystery".to_string(),
                ..LlmConfig::default()
            },
        };
        assert!(matches!(
            config.to_provider_config().unwrap_err(),
            CuratorError::Config(_)
        ));
    }
}
