//! Application configuration

pub mod client;
pub mod prompts;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use client::{ChatConfig, CompletionConfig, ConfigError, SamplingConfig};
pub use prompts::{builtin as prompts_builtin, PromptTemplate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Optional TOML file with [`ChatConfig`] overrides
    pub config_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            config_path: env::var("OLIV_CONFIG").ok().map(PathBuf::from),
        })
    }

    /// Chat settings from `config_path`, or the defaults when none is set
    pub fn chat_config(&self) -> Result<ChatConfig, ConfigError> {
        match &self.config_path {
            Some(path) => ChatConfig::from_file(path),
            None => Ok(ChatConfig::default()),
        }
    }
}

impl CompletionConfig {
    /// Bearer credential from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
