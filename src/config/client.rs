//! Chat configuration loaded from TOML files
//!
//! A deployment can override:
//! - The completion endpoint, model and request markers
//! - The sampling constants sent with every request
//! - The assistant persona template
//!
//! Every section is optional; an empty file yields the built-in defaults.

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root chat configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Completion service settings
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Assistant persona settings
    #[serde(default)]
    pub assistant: AssistantConfig,
}

impl ChatConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ChatConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let completion = &self.completion;
        if completion.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation("completion.endpoint is empty".into()));
        }
        if completion.model.trim().is_empty() {
            return Err(ConfigError::Validation("completion.model is empty".into()));
        }
        for (field, value) in [
            ("completion.referer", &completion.referer),
            ("completion.app_title", &completion.app_title),
        ] {
            if HeaderValue::from_str(value).is_err() {
                return Err(ConfigError::Validation(format!(
                    "{} is not a valid header value: {:?}",
                    field, value
                )));
            }
        }
        if completion.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "completion.timeout_secs must be positive".into(),
            ));
        }
        let sampling = &completion.sampling;
        if !(0.0..=2.0).contains(&sampling.temperature) {
            return Err(ConfigError::Validation(format!(
                "completion.sampling.temperature {} is outside 0..=2",
                sampling.temperature
            )));
        }
        if !(0.0..=1.0).contains(&sampling.top_p) || sampling.top_p == 0.0 {
            return Err(ConfigError::Validation(format!(
                "completion.sampling.top_p {} is outside (0, 1]",
                sampling.top_p
            )));
        }
        if sampling.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "completion.sampling.max_tokens must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Full chat-completions URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the bearer credential
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Value of the `HTTP-Referer` header
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Value of the `X-Title` header
    #[serde(default = "default_app_title")]
    pub app_title: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub sampling: SamplingConfig,
}

fn default_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "qwen/qwen3-8b:free".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_referer() -> String {
    "http://localhost:3000".to_string()
}

fn default_app_title() -> String {
    "Rilliv Education Chat".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            referer: default_referer(),
            app_title: default_app_title(),
            timeout_secs: default_timeout_secs(),
            sampling: SamplingConfig::default(),
        }
    }
}

/// Sampling constants, fixed for the process lifetime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_penalty")]
    pub frequency_penalty: f32,

    #[serde(default = "default_penalty")]
    pub presence_penalty: f32,
}

fn default_temperature() -> f32 {
    0.8
}

fn default_max_tokens() -> u32 {
    300
}

fn default_top_p() -> f32 {
    0.9
}

fn default_penalty() -> f32 {
    0.1
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: default_penalty(),
            presence_penalty: default_penalty(),
        }
    }
}

/// Assistant persona configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Prompt template replacing the built-in Oliv persona
    #[serde(default)]
    pub persona_file: Option<PathBuf>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"
[completion]
endpoint = "http://localhost:8080/v1/chat/completions"
model = "meta-llama/llama-3.1-8b-instruct"
api_key_env = "OLIV_TEST_KEY"
referer = "https://chat.rilliv.id"
timeout_secs = 15

[completion.sampling]
temperature = 0.5
max_tokens = 120

[assistant]
persona_file = "personas/oliv.toml"
"#;

    #[test]
    fn test_parse_config() {
        let config = ChatConfig::from_str(SAMPLE_CONFIG).unwrap();

        let completion = &config.completion;
        assert_eq!(completion.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(completion.model, "meta-llama/llama-3.1-8b-instruct");
        assert_eq!(completion.api_key_env, "OLIV_TEST_KEY");
        assert_eq!(completion.referer, "https://chat.rilliv.id");
        assert_eq!(completion.app_title, "Rilliv Education Chat"); // Default
        assert_eq!(completion.timeout_secs, 15);

        assert_eq!(completion.sampling.temperature, 0.5);
        assert_eq!(completion.sampling.max_tokens, 120);
        assert_eq!(completion.sampling.top_p, 0.9); // Default
        assert_eq!(completion.sampling.presence_penalty, 0.1); // Default

        assert_eq!(
            config.assistant.persona_file,
            Some(PathBuf::from("personas/oliv.toml"))
        );
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = ChatConfig::from_str("").unwrap();
        assert_eq!(config.completion.model, "qwen/qwen3-8b:free");
        assert_eq!(
            config.completion.endpoint,
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(config.completion.sampling, SamplingConfig::default());
        assert!(config.assistant.persona_file.is_none());
    }

    #[test]
    fn test_invalid_sampling_is_rejected() {
        let config = r#"
[completion.sampling]
temperature = 3.5
"#;
        let err = ChatConfig::from_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let err = ChatConfig::from_str("[completion]\nmodel = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_header_breaking_referer_is_rejected() {
        let err = ChatConfig::from_str("[completion]\nreferer = \"https://a\\nb\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("completion.referer")));
    }

    #[test]
    fn test_header_breaking_app_title_is_rejected() {
        let config = r#"
[completion]
app_title = "Rilliv\r\nX-Injected: 1"
"#;
        let err = ChatConfig::from_str(config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("completion.app_title")));
    }

    #[test]
    fn test_unreadable_file() {
        let err = ChatConfig::from_file(Path::new("/nonexistent/oliv.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
