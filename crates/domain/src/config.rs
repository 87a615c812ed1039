//! Client configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_VERSION, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use crate::errors::{ArmisError, Result};

/// Connection settings for one Armis tenant
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmisConfig {
    /// Tenant root, e.g. `https://acme.armis.com`
    pub base_url: String,
    /// Credential key exchanged for an access token
    pub api_key: String,
    /// API path version, `v1` unless overridden
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Per-attempt timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts for retryable failures (initial try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Sent as `User-Agent` on every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl ArmisConfig {
    /// Configuration with defaults for everything but the tenant and key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            user_agent: default_user_agent(),
        }
    }

    /// Structural checks that need no I/O. URL syntax is checked by the
    /// infrastructure loader.
    ///
    /// # Errors
    /// Returns `ArmisError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ArmisError::Config("base_url must not be empty".into()));
        }
        if self.api_key.is_empty() {
            return Err(ArmisError::Config("api_key must not be empty".into()));
        }
        if self.api_version.trim().is_empty() {
            return Err(ArmisError::Config("api_version must not be empty".into()));
        }
        if self.max_attempts == 0 {
            return Err(ArmisError::Config("max_attempts must be greater than 0".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ArmisError::Config("timeout_secs must be greater than 0".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for ArmisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmisConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_partial_json() {
        let config: ArmisConfig =
            serde_json::from_str(r#"{"base_url": "https://t.armis.com", "api_key": "k"}"#)
                .unwrap();

        assert_eq!(config.api_version, "v1");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_attempts, 3);
        assert!(config.user_agent.starts_with("armis-client/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let base = ArmisConfig::new("https://t.armis.com", "k");

        let no_key = ArmisConfig { api_key: String::new(), ..base.clone() };
        assert!(matches!(no_key.validate(), Err(ArmisError::Config(_))));

        let zero_attempts = ArmisConfig { max_attempts: 0, ..base.clone() };
        assert!(zero_attempts.validate().is_err());

        let blank_url = ArmisConfig { base_url: " ".into(), ..base };
        assert!(blank_url.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ArmisConfig::new("https://t.armis.com", "very-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("very-secret"));
    }
}
