//! Configuration snapshot loaded once at startup.
//!
//! The file format is TOML; every field has a sane default so a daemon can
//! be started against an empty or partial file. The external API key, if
//! present, is never included in `Debug` output.

use crate::error::NovaError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[cfg(test)]
mod tests;

fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/nova_socket")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./cathedral")
}

fn default_poll_interval() -> u64 {
    10
}

fn default_heartbeat_interval() -> u64 {
    180
}

fn default_evolve_interval() -> u64 {
    600
}

/// Raw, on-disk shape of the config file. Every field is optional so a
/// partial or empty file is valid; [`Config::resolve`] fills in defaults
/// and derives the paths that live under `data_dir`.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    socket_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    db_path: Option<PathBuf>,
    bridge_dir: Option<PathBuf>,
    poll_interval_secs: Option<u64>,
    heartbeat_interval_secs: Option<u64>,
    evolve_interval_secs: Option<u64>,
    external_api_key: Option<String>,
}

/// Immutable configuration snapshot for the lifetime of a process.
#[derive(Clone)]
pub struct Config {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub bridge_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub poll_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub evolve_interval_secs: u64,
    external_api_key: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("socket_path", &self.socket_path)
            .field("data_dir", &self.data_dir)
            .field("db_path", &self.db_path)
            .field("bridge_dir", &self.bridge_dir)
            .field("logs_dir", &self.logs_dir)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("heartbeat_interval_secs", &self.heartbeat_interval_secs)
            .field("evolve_interval_secs", &self.evolve_interval_secs)
            .field(
                "external_api_key",
                &self.external_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Config {
    /// Load and resolve configuration from a TOML file at `path`. A
    /// missing file is not an error — defaults apply — but a file that
    /// exists and fails to parse is a fatal `ConfigError`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NovaError> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str::<RawConfig>(&contents)
                .map_err(|e| NovaError::Config(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RawConfig::default(),
            Err(e) => {
                return Err(NovaError::Config(format!(
                    "reading {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Self::resolve(raw)
    }

    /// Resolve defaults with no file at all (used by tests and by
    /// `novad` when invoked with no `--config`).
    pub fn default_snapshot() -> Result<Self, NovaError> {
        Self::resolve(RawConfig::default())
    }

    fn resolve(raw: RawConfig) -> Result<Self, NovaError> {
        let data_dir = raw.data_dir.unwrap_or_else(default_data_dir);
        let db_path = raw.db_path.unwrap_or_else(|| data_dir.join("nova.db"));
        let bridge_dir = raw.bridge_dir.unwrap_or_else(|| data_dir.join("bridge"));
        let logs_dir = data_dir.join("logs");

        let external_api_key = raw
            .external_api_key
            .or_else(|| std::env::var("NOVA_EXTERNAL_API_KEY").ok())
            .filter(|k| !k.is_empty());

        let cfg = Config {
            socket_path: raw.socket_path.unwrap_or_else(default_socket_path),
            data_dir,
            db_path,
            bridge_dir,
            logs_dir,
            poll_interval_secs: raw.poll_interval_secs.unwrap_or_else(default_poll_interval),
            heartbeat_interval_secs: raw
                .heartbeat_interval_secs
                .unwrap_or_else(default_heartbeat_interval),
            evolve_interval_secs: raw
                .evolve_interval_secs
                .unwrap_or_else(default_evolve_interval),
            external_api_key,
        };

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), NovaError> {
        if self.poll_interval_secs == 0 {
            return Err(NovaError::Config("poll_interval_secs must be > 0".into()));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(NovaError::Config(
                "heartbeat_interval_secs must be > 0".into(),
            ));
        }
        if self.evolve_interval_secs == 0 {
            return Err(NovaError::Config("evolve_interval_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Ensure every directory this config names exists, creating them if
    /// necessary (§7: a config/data-dir problem is a startup-time
    /// `ConfigError`).
    pub fn ensure_directories(&self) -> Result<(), NovaError> {
        for dir in [
            &self.data_dir,
            &self.logs_dir,
            &self.bridge_dir,
            &self.bridge_dir.join("outbox"),
            &self.bridge_dir.join("inbox"),
            &self.bridge_dir.join("archive"),
        ] {
            std::fs::create_dir_all(dir)
                .map_err(|e| NovaError::Config(format!("creating {}: {}", dir.display(), e)))?;
        }
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| NovaError::Config(format!("creating {}: {}", parent.display(), e)))?;
        }
        Ok(())
    }

    pub fn external_api_key(&self) -> Option<&str> {
        self.external_api_key.as_deref()
    }
}
