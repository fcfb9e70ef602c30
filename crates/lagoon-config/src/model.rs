//! Configuration schema models.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level Lagoon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LagoonConfig {
    /// Session store settings.
    pub store: StoreConfig,
    /// Turn execution settings.
    pub turn: TurnConfig,
}

/// Session store settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the store file. Defaults to `sessions.json` under the user
    /// config directory when unset.
    pub path: Option<String>,
}

/// Turn execution settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TurnConfig {
    /// Seconds to wait for each generated fragment before the turn fails.
    pub fragment_timeout_secs: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            fragment_timeout_secs: 60,
        }
    }
}

impl LagoonConfig {
    /// Validate field constraints on the effective config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.turn.fragment_timeout_secs == 0 {
            return Err(ConfigError::InvalidField {
                path: "turn.fragment_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve the store file path, falling back to the user config dir.
    pub fn store_path(&self) -> PathBuf {
        match &self.store.path {
            Some(path) => PathBuf::from(path),
            None => crate::loader::default_data_dir().join("sessions.json"),
        }
    }

    /// Per-fragment timeout as a duration.
    pub fn fragment_timeout(&self) -> Duration {
        Duration::from_secs(self.turn.fragment_timeout_secs)
    }
}
