use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 5001;

/// Server configuration persisted as TOML.
///
/// Fields:
/// - bind: socket address the HTTP/WebSocket listener binds to
/// - store: which membership backend to use and where it lives
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: SocketAddr,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database file, only used by the sqlite backend.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Drop leftover membership rows at startup. No connection survives a
    /// restart, so any row found then is stale.
    #[serde(default = "default_true")]
    pub purge_on_start: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("lobbies.db")
}

fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: StoreBackend::Memory,
            path: default_db_path(),
            purge_on_start: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            store: StoreConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`. If the file does not exist, create it
    /// with reasonable defaults and return the default config.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)
                .with_context(|| format!("reading config file '{}'", path.display()))?;
            let cfg: Config = toml::from_str(&s)
                .with_context(|| format!("parsing TOML config '{}'", path.display()))?;
            Ok(cfg)
        } else {
            let cfg = Config::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Save the current config state back to the provided path (overwrites).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating config directory '{}'", parent.display()))?;
            }
        }
        let toml_text = toml::to_string_pretty(&self)
            .with_context(|| "serializing config to TOML")?;
        fs::write(path, toml_text)
            .with_context(|| format!("writing config to '{}'", path.display()))?;
        Ok(())
    }

    /// Point the store at a sqlite file, switching the backend if needed.
    pub fn use_sqlite(&mut self, path: PathBuf) {
        self.store.backend = StoreBackend::Sqlite;
        self.store.path = path;
    }
}
