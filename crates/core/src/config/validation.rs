//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn require_absolute(field: &str, path: &str) -> Result<(), ConfigError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field: field.into(), reason: format!("'{path}' must start with '/'") })
    }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `generation` is 0 or above `i64::MAX`
    /// - `app_origin` is not an http(s) URL
    /// - a path setting is not absolute
    /// - the manifest is empty, has duplicates, or lacks the shell/placeholder
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.get() == 0 {
            return Err(ConfigError::Invalid { field: "generation".into(), reason: "must be greater than 0".into() });
        }
        if i64::try_from(self.generation.get()).is_err() {
            return Err(ConfigError::Invalid {
                field: "generation".into(),
                reason: format!("must not exceed {}", i64::MAX),
            });
        }

        self.origin_url()?;

        require_absolute("api_prefix", &self.api_prefix)?;
        require_absolute("app_shell_path", &self.app_shell_path)?;
        require_absolute("placeholder_image_path", &self.placeholder_image_path)?;

        if self.precache_manifest.is_empty() {
            return Err(ConfigError::Missing {
                field: "precache_manifest".into(),
                hint: "list at least the application shell".into(),
            });
        }

        let mut seen = HashSet::new();
        for path in &self.precache_manifest {
            require_absolute("precache_manifest", path)?;
            if !seen.insert(path.as_str()) {
                return Err(ConfigError::Invalid {
                    field: "precache_manifest".into(),
                    reason: format!("duplicate entry '{path}'"),
                });
            }
        }

        for (field, path) in
            [("app_shell_path", &self.app_shell_path), ("placeholder_image_path", &self.placeholder_image_path)]
        {
            if !seen.contains(path.as_str()) {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: format!("'{path}' must be listed in precache_manifest"),
                });
            }
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.bypass_hosts.is_empty() {
            tracing::warn!("bypass_hosts is empty; third-party auth requests will only be skipped as cross-origin");
        }

        Ok(())
    }
}
