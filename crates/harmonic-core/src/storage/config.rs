//! TOML-based application configuration.
//!
//! Stores:
//! - Request quota settings (window length, request limit)
//! - Badge settings (whether award events are persisted)
//!
//! Configuration is stored at `<data_dir>/config.toml`. The request limit can
//! additionally be overridden per process with `HX_REQUEST_QUOTA_LIMIT`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::quota::{
    is_valid_window, QuotaPolicy, DEFAULT_REQUEST_LIMIT, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS,
    QUOTA_LIMIT_ENV,
};

/// Request quota configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaSettings {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

/// Badge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeSettings {
    /// Persist award events when a tier is first reached.
    #[serde(default = "default_true")]
    pub record_awards: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub quota: QuotaSettings,
    #[serde(default)]
    pub badges: BadgeSettings,
}

fn default_limit() -> u32 {
    DEFAULT_REQUEST_LIMIT
}
fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}
fn default_true() -> bool {
    true
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            window_days: default_window_days(),
        }
    }
}

impl Default for BadgeSettings {
    fn default() -> Self {
        Self {
            record_awards: true,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u32>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as a non-negative integer")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return (and persist) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        if !is_valid_window(updated.quota.window_days) {
            return Err(invalid(format!(
                "window must be between 1 and {MAX_WINDOW_DAYS} days"
            )));
        }
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Quota policy from the file, with a valid `HX_REQUEST_QUOTA_LIMIT`
    /// taking precedence over the configured limit.
    pub fn quota_policy(&self) -> QuotaPolicy {
        self.quota_policy_with_override(std::env::var(QUOTA_LIMIT_ENV).ok().as_deref())
    }

    /// Same as [`Config::quota_policy`] with an explicit override value.
    ///
    /// A hand-edited window outside `1..=MAX_WINDOW_DAYS` falls back to the
    /// default window.
    pub fn quota_policy_with_override(&self, raw_limit: Option<&str>) -> QuotaPolicy {
        let window_days = if is_valid_window(self.quota.window_days) {
            self.quota.window_days
        } else {
            tracing::warn!(
                window_days = self.quota.window_days,
                fallback = DEFAULT_WINDOW_DAYS,
                "ignoring invalid quota.window_days"
            );
            DEFAULT_WINDOW_DAYS
        };
        let configured = QuotaPolicy {
            window_days,
            limit: if self.quota.limit > 0 {
                self.quota.limit
            } else {
                DEFAULT_REQUEST_LIMIT
            },
        };
        configured.with_limit_override(raw_limit)
    }
}
