//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file from the working directory when one exists
//! 2. Attempts to load from environment variables
//! 3. If a required variable is missing, falls back to a config file
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `ARMIS_API_URL`: tenant base URL (required)
//! - `ARMIS_API_KEY`: credential key (required)
//! - `ARMIS_API_VERSION`: API version segment, default `v1`
//! - `ARMIS_TIMEOUT_SECS`: per-attempt timeout in seconds
//! - `ARMIS_MAX_ATTEMPTS`: attempts for retryable failures
//!
//! ## File Locations
//! `./armis.{json,toml}` then `./config.{json,toml}`, in the working
//! directory and next to the executable.

use std::path::{Path, PathBuf};

use armis_domain::{ArmisConfig, ArmisError, Result};
use url::Url;

use crate::errors::InfraError;

/// Tenant base URL, required when loading from the environment
pub const ENV_API_URL: &str = "ARMIS_API_URL";
/// Credential key, required when loading from the environment
pub const ENV_API_KEY: &str = "ARMIS_API_KEY";
/// Overrides `api_version`
pub const ENV_API_VERSION: &str = "ARMIS_API_VERSION";
/// Overrides `timeout_secs`
pub const ENV_TIMEOUT_SECS: &str = "ARMIS_TIMEOUT_SECS";
/// Overrides `max_attempts`
pub const ENV_MAX_ATTEMPTS: &str = "ARMIS_MAX_ATTEMPTS";

const CONFIG_FILE_NAMES: [&str; 4] = ["armis.json", "armis.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `ArmisError::Config` if configuration cannot be loaded from either
/// source or fails validation.
pub fn load() -> Result<ArmisConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `ArmisError::Config` if a required variable is missing, a numeric
/// variable does not parse, or the result fails [`validate`].
pub fn load_from_env() -> Result<ArmisConfig> {
    let mut config = ArmisConfig::new(env_var(ENV_API_URL)?, env_var(ENV_API_KEY)?);

    if let Some(version) = optional_env(ENV_API_VERSION) {
        config.api_version = version;
    }
    if let Some(timeout) = optional_env(ENV_TIMEOUT_SECS) {
        config.timeout_secs = parse_number(ENV_TIMEOUT_SECS, &timeout)?;
    }
    if let Some(attempts) = optional_env(ENV_MAX_ATTEMPTS) {
        config.max_attempts = parse_number(ENV_MAX_ATTEMPTS, &attempts)?;
    }

    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `ArmisError::Config` if the file is missing, unreadable, malformed
/// or fails [`validate`].
pub fn load_from_file(path: Option<PathBuf>) -> Result<ArmisConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ArmisError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ArmisError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(InfraError::from)?;
    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Structural checks plus an absolute `http`/`https` base URL.
///
/// # Errors
/// Returns `ArmisError::Config` naming the offending field.
pub fn validate(config: &ArmisConfig) -> Result<()> {
    config.validate()?;

    let url = Url::parse(config.base_url.trim()).map_err(InfraError::from)?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        "http" | "https" => Err(ArmisError::Config("base_url has no host".into())),
        other => Err(ArmisError::Config(format!("unsupported URL scheme: {other}"))),
    }
}

fn parse_config(contents: &str, path: &Path) -> Result<ArmisConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => Ok(toml::from_str(contents).map_err(InfraError::from)?),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ArmisError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(ArmisError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// First existing candidate among the standard config file locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    optional_env(key)
        .ok_or_else(|| ArmisError::Config(format!("Missing required environment variable: {}", key)))
}

/// Set and non-blank.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_number<N: std::str::FromStr>(key: &str, raw: &str) -> Result<N>
where
    N::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<N>()
        .map_err(|e| ArmisError::Config(format!("Invalid value for {key}: {e}")))
}
