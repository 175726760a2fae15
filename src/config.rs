use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::Identity;
use crate::storage::DEFAULT_ROOM;

pub const DEFAULT_CONFIG_PATH: &str = "config/chat.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory for per-room databases.
    pub data_dir: PathBuf,
    pub default_room: String,
    pub poll_interval_ms: u64,
    /// Overlap re-read on every poll so late writers are not skipped.
    pub lookback_ms: u64,
    /// Probability that a sent message gets a simulated reply.
    pub reply_chance: f64,
    /// Set once on first run, reused afterwards.
    pub identity: Option<Identity>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            default_room: DEFAULT_ROOM.to_string(),
            poll_interval_ms: 1_000,
            lookback_ms: 1_000,
            reply_chance: 0.8,
            identity: None,
        }
    }
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero period would make the tokio interval panic.
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn lookback(&self) -> Duration {
        Duration::from_millis(self.lookback_ms)
    }

    pub fn reply_chance(&self) -> f64 {
        if self.reply_chance.is_nan() {
            0.0
        } else {
            self.reply_chance.clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path} is not valid: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AppConfig {
    /// Read `path`. A missing file is not an error and yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&content).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write to `path` through a sibling temp file, so a crash never leaves
    /// a half-written config behind.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })?;

        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(io_err)?;
        fs::rename(&staging, path).map_err(io_err)
    }

    /// Identity for this run. Returns `true` when it differs from the stored
    /// one and should be saved.
    ///
    /// An explicit nickname renames the stored identity, keeping its sender
    /// label; without one the stored identity is reused, or an anonymous
    /// one is created on first run.
    pub fn resolve_identity(&mut self, nickname: Option<&str>) -> (Identity, bool) {
        let nickname = nickname.map(str::trim).filter(|nick| !nick.is_empty());

        let identity = match (self.identity.as_ref(), nickname) {
            (Some(stored), None) => return (stored.clone(), false),
            (Some(stored), Some(nick)) if stored.nickname == nick => return (stored.clone(), false),
            (Some(stored), Some(nick)) => stored.renamed(nick),
            (None, Some(nick)) => Identity::new(nick),
            (None, None) => Identity::anonymous(),
        };

        self.identity = Some(identity.clone());
        (identity, true)
    }
}

/// Load the config for the CLI, falling back to defaults on any error.
pub fn load_or_default(path: &Path) -> AppConfig {
    AppConfig::load(path).unwrap_or_else(|err| {
        log::warn!("{err}; using defaults");
        AppConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Invalid { .. })
        ));
        assert_eq!(load_or_default(&path), AppConfig::default());
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        fs::write(&path, r#"{ "poll_interval_ms": 250, "default_room": "movies" }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.default_room, "movies");
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn reply_chance_is_clamped() {
        let mut config = AppConfig::default();
        config.reply_chance = 3.0;
        assert_eq!(config.reply_chance(), 1.0);
        config.reply_chance = f64::NAN;
        assert_eq!(config.reply_chance(), 0.0);
    }

    #[test]
    fn identity_is_created_once_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/chat.json");

        let mut config = AppConfig::load(&path).unwrap();
        let (first, changed) = config.resolve_identity(None);
        assert!(changed);
        assert!(first.nickname.starts_with("anon-"));
        config.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let mut reloaded = AppConfig::load(&path).unwrap();
        let (second, changed) = reloaded.resolve_identity(None);
        assert!(!changed);
        assert_eq!(first, second);
    }

    #[test]
    fn explicit_nickname_renames_but_keeps_sender() {
        let mut config = AppConfig::default();
        let (first, _) = config.resolve_identity(Some("alice"));
        let (same, changed) = config.resolve_identity(Some("alice"));
        assert!(!changed);
        assert_eq!(same, first);

        let (renamed, changed) = config.resolve_identity(Some("  bob "));
        assert!(changed);
        assert_eq!(renamed.nickname, "bob");
        assert_eq!(renamed.sender, first.sender);
        assert_eq!(config.identity, Some(renamed));
    }

    #[test]
    fn save_into_unwritable_location_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("config");
        fs::write(&blocker, b"file, not dir").unwrap();

        let err = AppConfig::default()
            .save(&blocker.join("chat.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
