//! Config file discovery and JSON5 loading.

use crate::{ConfigError, LagoonConfig};
use directories::BaseDirs;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename under the user config directory.
const DEFAULT_CONFIG_FILE: &str = "lagoon.json5";
/// Default directory name under the user home.
const DEFAULT_CONFIG_DIR: &str = ".lagoon";

/// Default user config path (`~/.lagoon/lagoon.json5`).
pub fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}

/// Default data directory for state files (`~/.lagoon`).
pub(crate) fn default_data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DEFAULT_CONFIG_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR))
}

/// Load and validate config from an explicit path.
pub fn load(path: impl AsRef<Path>) -> Result<LagoonConfig, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let config: LagoonConfig = json5::from_str(&raw)?;
    config.validate()?;
    info!("loaded config (path={})", path.display());
    Ok(config)
}

/// Load config from the given path or the default location, falling back to
/// defaults when no file exists.
pub fn load_or_default(path: Option<&Path>) -> Result<LagoonConfig, ConfigError> {
    let candidate = match path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };
    match candidate {
        Some(path) if path.exists() => load(path),
        Some(path) => {
            debug!("no config file, using defaults (path={})", path.display());
            Ok(LagoonConfig::default())
        }
        None => Ok(LagoonConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::{load, load_or_default};
    use crate::{ConfigError, LagoonConfig};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn loads_json5_with_comments_and_partial_fields() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("lagoon.json5");
        std::fs::write(
            &path,
            r#"{
                // store file lives next to the config in this setup
                store: { path: "sessions.json" },
            }"#,
        )
        .expect("write config");

        let config = load(&path).expect("load");
        assert_eq!(config.store.path, Some("sessions.json".to_string()));
        assert_eq!(config.turn, LagoonConfig::default().turn);
    }

    #[test]
    fn invalid_field_fails_load() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("lagoon.json5");
        std::fs::write(&path, r#"{ turn: { fragment_timeout_secs: 0 } }"#).expect("write config");

        match load(&path) {
            Err(ConfigError::InvalidField { path, .. }) => {
                assert_eq!(path, "turn.fragment_timeout_secs");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("absent.json5");
        let config = load_or_default(Some(path.as_path())).expect("load");
        assert_eq!(config, LagoonConfig::default());
    }
}
