//! Configuration management
//!
//! Settings are resolved in this order (later wins):
//! 1. Defaults
//! 2. `ragchat.toml` (or an explicit path)
//! 3. Environment variables
//!
//! `${VAR_NAME}` inside the config file is replaced with the value of the
//! environment variable.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::session::Mode;
use crate::{Error, Result};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "ragchat.toml";

/// Chat backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Base address of the chat service; requests go to `{base_url}/api/chat`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Deadline for a single exchange, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Conversation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatConfig {
    /// Mode a new session starts in
    #[serde(default)]
    pub default_mode: Mode,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Main configuration for ragchat
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    /// Replace `${VAR_NAME}` with environment values
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let config: Config = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default locations
    ///
    /// Uses `./ragchat.toml` when present, otherwise defaults plus
    /// environment variables.
    pub fn load() -> Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }
        Self::from_env()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override settings with environment variables
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(base_url) = std::env::var("RAGCHAT_BASE_URL") {
            if !base_url.is_empty() {
                self.backend.base_url = base_url;
            }
        }

        if let Ok(timeout) = std::env::var("RAGCHAT_TIMEOUT_SECS") {
            if !timeout.is_empty() {
                self.backend.timeout_secs = timeout.trim().parse().map_err(|_| {
                    Error::Config(format!("RAGCHAT_TIMEOUT_SECS is not a number: {}", timeout))
                })?;
            }
        }

        if let Ok(mode) = std::env::var("RAGCHAT_DEFAULT_MODE") {
            if !mode.is_empty() {
                self.chat.default_mode = mode.parse().map_err(Error::Config)?;
            }
        }

        Ok(())
    }

    /// Check that the settings are usable
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.backend.base_url).map_err(|e| {
            Error::Config(format!("Invalid base_url '{}': {}", self.backend.base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.backend.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Deadline for one exchange
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    /// Full URL of the chat endpoint
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.backend.base_url.trim_end_matches('/'))
    }
}
