//! Application settings loaded from `config.toml`.

use crate::core::gemini::GEMINI_KEY_ENV;
use crate::core::generation::GenerationConfig;
use crate::core::openai::OPENAI_KEY_ENV;
use crate::core::transcript::DEFAULT_LANGUAGE;
use crate::error::{Error, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,
    pub generation: GenerationConfig,
    pub transcript: TranscriptSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    #[display("gemini")]
    Gemini,
    #[display("openai")]
    OpenAi,
}

impl ProviderKind {
    pub fn default_key_env(self) -> &'static str {
        match self {
            Self::Gemini => GEMINI_KEY_ENV,
            Self::OpenAi => OPENAI_KEY_ENV,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-pro",
            Self::OpenAi => "gpt-4.1",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub provider: ProviderKind,
    /// Model name; the provider's default when unset.
    pub name: Option<String>,
    /// Environment variable holding the API key; the provider's default when unset.
    pub api_key_env: Option<String>,
    /// Override for the provider's API base URL.
    pub api_base: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

const DEFAULT_TIMEOUT_SECS: u64 = 300;

impl ModelSettings {
    pub fn model_name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }

    pub fn key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_key_env())
    }

    /// Reads the API key. An absent or blank variable yields `None`; remote
    /// calls then fail individually instead of at startup.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(self.key_env())
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Caption language tried before any other.
    pub preferred_language: String,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            preferred_language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level used when neither `RUST_LOG` nor `-v` is given.
    pub level: String,
    /// Log file used while the TUI owns the terminal.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Settings {
    /// Loads from `path`, or the default location. A missing file means defaults.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else if path.is_some() {
            Err(Error::Config(format!(
                "config file not found: {}",
                config_path.display()
            )))
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let generation = &self.generation;
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(Error::Config(format!(
                "generation.temperature must be within 0..=2, got {}",
                generation.temperature
            )));
        }
        if !(0.0..=1.0).contains(&generation.top_p) {
            return Err(Error::Config(format!(
                "generation.top_p must be within 0..=1, got {}",
                generation.top_p
            )));
        }
        if generation.max_output_tokens == 0 {
            return Err(Error::Config(
                "generation.max_output_tokens must be positive".to_string(),
            ));
        }
        if self.transcript.preferred_language.trim().is_empty() {
            return Err(Error::Config(
                "transcript.preferred_language cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidchat")
            .join("config.toml")
    }

    pub fn log_file(&self) -> PathBuf {
        self.logging.file.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("vidchat")
                .join("vidchat.log")
        })
    }
}
