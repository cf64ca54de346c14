//! Configuration management for the CLI.

use fieldbridge_engine::UserId;
use std::{env, path::PathBuf, str::FromStr};

/// Store path used when neither `--store` nor `FIELDBRIDGE_STORE` is set.
pub const DEFAULT_STORE_PATH: &str = "store.json";

/// When to register the SEO container handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeoMode {
    /// Only when the store reports the integration as enabled
    #[default]
    Auto,
    On,
    Off,
}

impl FromStr for SeoMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "on" | "true" | "1" => Ok(Self::On),
            "off" | "false" | "0" => Ok(Self::Off),
            _ => Err(ConfigError::InvalidSeoMode(s.to_string())),
        }
    }
}

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Path to the JSON store snapshot
    pub store_path: PathBuf,
    pub seo: SeoMode,
    /// Overrides the store's control panel URL for edit links
    pub cp_url: Option<String>,
    /// Acting user recorded on new drafts
    pub user_id: Option<UserId>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store_path = lookup("FIELDBRIDGE_STORE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string())
            .into();

        let seo = match lookup("FIELDBRIDGE_SEO_INTEGRATION") {
            Some(raw) => raw.parse()?,
            None => SeoMode::default(),
        };

        let cp_url = lookup("FIELDBRIDGE_CP_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        let user_id = lookup("FIELDBRIDGE_USER_ID")
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidUserId(s.clone()))
            })
            .transpose()?;

        Ok(Self {
            store_path,
            seo,
            cp_url,
            user_id,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid FIELDBRIDGE_SEO_INTEGRATION value '{0}' (expected auto, on or off)")]
    InvalidSeoMode(String),

    #[error("Invalid FIELDBRIDGE_USER_ID value '{0}'")]
    InvalidUserId(String),
}
