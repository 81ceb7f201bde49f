// SPDX-License-Identifier: Apache-2.0

//! Configuration management for Wayfare.
//!
//! Provides layered configuration from files and environment variables.
//! Uses XDG-compliant paths with environment variable support.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables (prefix: `WAYFARE_`)
//! 2. Config file: `~/.config/wayfare/config.toml`
//! 3. Built-in defaults
//!
//! # Examples
//!
//! ```bash
//! # Allow five attempts per search
//! WAYFARE_RETRY__MAX_ATTEMPTS=5 wayfare search --from DEL --to BOM --date 2024-12-01
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::WayfareError;
use crate::policy::RetryPolicy;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Retry loop settings.
    pub retry: RetryConfig,
    /// Per-request settings.
    pub request: RequestConfig,
    /// Search orchestration settings.
    pub search: SearchConfig,
}

/// Retry loop settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per search, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Builds the validated retry policy.
    ///
    /// # Errors
    ///
    /// Returns `WayfareError::Config` for out-of-range values.
    pub fn to_policy(&self) -> Result<RetryPolicy, WayfareError> {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// Per-request settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Timeout for a single backend call in milliseconds.
    pub per_call_timeout_ms: u64,
    /// Optional deadline for the whole retry loop in milliseconds.
    pub outer_timeout_ms: Option<u64>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            per_call_timeout_ms: 30_000,
            outer_timeout_ms: None,
        }
    }
}

/// Search orchestration settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Flight search endpoint.
    pub endpoint: String,
    /// Delay before resuming a failed search once connectivity returns, in milliseconds.
    pub resume_guard_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4000/api/flights/search".to_string(),
            resume_guard_ms: 2000,
        }
    }
}

/// Returns the Wayfare configuration directory.
///
/// Respects the `XDG_CONFIG_HOME` environment variable if set,
/// otherwise defaults to `~/.config/wayfare`.
///
/// # Errors
///
/// Returns `WayfareError::Config` if the home directory cannot be determined.
pub fn config_dir() -> Result<PathBuf, WayfareError> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return Ok(PathBuf::from(xdg_config).join("wayfare"));
    }
    dirs::home_dir()
        .map(|home| home.join(".config").join("wayfare"))
        .ok_or_else(|| WayfareError::Config {
            message: "Could not determine home directory - is HOME set?".to_string(),
        })
}

/// Returns the path to the configuration file.
///
/// # Errors
///
/// Returns `WayfareError::Config` if the home directory cannot be determined.
pub fn config_file_path() -> Result<PathBuf, WayfareError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load application configuration from the default location.
///
/// # Errors
///
/// Returns `WayfareError::Config` if the config file exists but is invalid.
pub fn load_config() -> Result<AppConfig, WayfareError> {
    let path = config_file_path()?;
    load_config_from(&path)
}

/// Load application configuration from `path` plus environment variables.
///
/// The file is optional. Environment variables use the prefix `WAYFARE_` and
/// double underscore for nested keys (e.g., `WAYFARE_RETRY__MAX_ATTEMPTS`).
///
/// # Errors
///
/// Returns `WayfareError::Config` if the file or environment is invalid.
pub fn load_config_from(path: &Path) -> Result<AppConfig, WayfareError> {
    let config = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix("WAYFARE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.retry.to_policy()?;

    Ok(app_config)
}
