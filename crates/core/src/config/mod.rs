//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STORECACHE_*)
//! 2. TOML config file (if STORECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::Generation;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STORECACHE_*)
/// 2. TOML config file (if STORECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite Cache Region Store.
    ///
    /// Set via STORECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Version token of this deployment. All region names share it.
    ///
    /// Set via STORECACHE_GENERATION environment variable.
    #[serde(default)]
    pub generation: Generation,

    /// Origin the storefront is served from.
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// Path substring marking backend API requests.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Third-party auth hosts that are never intercepted nor cached.
    #[serde(default = "default_bypass_hosts")]
    pub bypass_hosts: Vec<String>,

    /// Absolute paths fetched into the static region at install time.
    #[serde(default = "default_precache_manifest")]
    pub precache_manifest: Vec<String>,

    /// Document served for navigations that miss both network and cache.
    #[serde(default = "default_app_shell_path")]
    pub app_shell_path: String,

    /// Image served when an image misses both network and cache.
    #[serde(default = "default_placeholder_image_path")]
    pub placeholder_image_path: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via STORECACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via STORECACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to read per response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./storecache.sqlite")
}

fn default_app_origin() -> String {
    "http://localhost:3000".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_bypass_hosts() -> Vec<String> {
    vec!["accounts.google.com".into(), "www.facebook.com".into()]
}

fn default_precache_manifest() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/favicon.ico", "/logo.png", "/images/placeholder.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_app_shell_path() -> String {
    "/".into()
}

fn default_placeholder_image_path() -> String {
    "/images/placeholder.png".into()
}

fn default_user_agent() -> String {
    "storecache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            generation: Generation::default(),
            app_origin: default_app_origin(),
            api_prefix: default_api_prefix(),
            bypass_hosts: default_bypass_hosts(),
            precache_manifest: default_precache_manifest(),
            app_shell_path: default_app_shell_path(),
            placeholder_image_path: default_placeholder_image_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `app_origin` is not an http(s) URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let parsed = url::Url::parse(&self.app_origin)
            .map_err(|e| ConfigError::Invalid { field: "app_origin".into(), reason: e.to_string() })?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(ConfigError::Invalid {
                field: "app_origin".into(),
                reason: format!("unsupported scheme: {other}"),
            }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STORECACHE_`
    /// 2. TOML file from `STORECACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STORECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STORECACHE_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
