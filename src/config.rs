//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CRICKET_LIVE_CONFIG_PATH";

const DEFAULT_TOTAL_OVERS: u32 = 20;
const DEFAULT_BROADCAST_CAPACITY: usize = 64;
const DEFAULT_MUTATION_TIMEOUT_MS: u64 = 5_000;

/// Persistence backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// MongoDB, supervised in the background.
    #[default]
    Mongo,
    /// Process-local maps; data is lost on restart.
    Memory,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Overs per innings when a new match does not specify them.
    pub default_total_overs: u32,
    /// Events buffered per subscriber before a slow viewer starts skipping.
    pub broadcast_capacity: usize,
    /// Upper bound for one read-modify-write of a match.
    pub mutation_timeout: Duration,
    pub storage: StorageBackend,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        storage = ?app_config.storage,
                        default_total_overs = app_config.default_total_overs,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document. Missing keys take their default value.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    default_total_overs: u32,
    broadcast_capacity: usize,
    mutation_timeout_ms: u64,
    storage: StorageBackend,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            default_total_overs: DEFAULT_TOTAL_OVERS,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
            mutation_timeout_ms: DEFAULT_MUTATION_TIMEOUT_MS,
            storage: StorageBackend::default(),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            default_total_overs: value.default_total_overs.clamp(1, 50),
            broadcast_capacity: value.broadcast_capacity.max(1),
            mutation_timeout: Duration::from_millis(value.mutation_timeout_ms.max(1)),
            storage: value.storage,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
