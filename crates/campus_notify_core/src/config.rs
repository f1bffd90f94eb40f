//! Engine configuration.
//!
//! # Responsibility
//! - Describe storage medium, toast durations and logging setup.
//! - Load from TOML with defaults for every omitted field.
//!
//! # Invariants
//! - `toast.urgent_duration_ms` is strictly greater than
//!   `toast.default_duration_ms` after validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_TOAST_DURATION_MS: u64 = 4_000;
pub const DEFAULT_URGENT_TOAST_DURATION_MS: u64 = 8_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Storage medium for the notification snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    #[default]
    Memory,
    JsonFile {
        path: PathBuf,
    },
    Sqlite {
        path: PathBuf,
    },
}

/// On-screen durations for created-notification toasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastConfig {
    pub default_duration_ms: u64,
    pub urgent_duration_ms: u64,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: DEFAULT_TOAST_DURATION_MS,
            urgent_duration_ms: DEFAULT_URGENT_TOAST_DURATION_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`; build-mode default when unset.
    pub level: Option<String>,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub storage: StorageConfig,
    pub toast: ToastConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.toast.default_duration_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "toast.default_duration_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.toast.urgent_duration_ms <= self.toast.default_duration_ms {
            return Err(ConfigError::Invalid {
                field: "toast.urgent_duration_ms",
                reason: format!(
                    "must exceed default duration {}ms",
                    self.toast.default_duration_ms
                ),
            });
        }
        match &self.storage {
            StorageConfig::JsonFile { path } | StorageConfig::Sqlite { path }
                if path.as_os_str().is_empty() =>
            {
                return Err(ConfigError::Invalid {
                    field: "storage.path",
                    reason: "must not be empty".to_string(),
                });
            }
            _ => {}
        }
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid {
                    field: "logging.dir",
                    reason: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
        }
        Ok(())
    }
}
