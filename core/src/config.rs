//! Client configuration.
//!
//! The backend base URL is the only required setting and is injected by the
//! host app. The token key is overridable so several environments can share
//! one device keychain.

use crate::error::ConfigError;
use crate::store::TOKEN_KEY;

pub const BACKEND_URL_ENV: &str = "DOSEMATE_BACKEND_URL";
pub const TOKEN_KEY_ENV: &str = "DOSEMATE_TOKEN_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub token_key: String,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBackendUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token_key: TOKEN_KEY.to_string(),
        })
    }

    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = key.into();
        self
    }

    /// Reads `DOSEMATE_BACKEND_URL` and, if set, `DOSEMATE_TOKEN_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup(BACKEND_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingBackendUrl(BACKEND_URL_ENV))?;
        let config = Self::new(&url)?;
        Ok(match lookup(TOKEN_KEY_ENV).filter(|v| !v.is_empty()) {
            Some(key) => config.with_token_key(key),
            None => config,
        })
    }
}
