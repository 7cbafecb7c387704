//! Application-level configuration loading: ledger display tuning and the
//! staker-config cache location.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CHIP_RAIL_BACK_CONFIG_PATH";
/// Window within which consecutive chip updates collapse into one display entry.
const DEFAULT_MERGE_WINDOW_SECS: u64 = 30;
/// Directory holding the local staker-config fallback cache.
const DEFAULT_STAKE_CACHE_DIR: &str = "cache/staking";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    merge_window: Duration,
    cache_dir: PathBuf,
}

impl AppConfig {
    /// Build a config directly, bypassing the file lookup.
    pub fn new(merge_window: Duration, cache_dir: PathBuf) -> Self {
        Self {
            merge_window,
            cache_dir,
        }
    }

    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        merge_window_secs = app_config.merge_window.as_secs(),
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

    /// Window used by the ledger merge-for-display view.
    pub fn merge_window(&self) -> Duration {
        self.merge_window
    }

    /// Directory for the local staker-config cache.
    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            merge_window: Duration::from_secs(DEFAULT_MERGE_WINDOW_SECS),
            cache_dir: PathBuf::from(DEFAULT_STAKE_CACHE_DIR),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    merge_window_secs: Option<u64>,
    stake_cache_dir: Option<PathBuf>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            merge_window: value
                .merge_window_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.merge_window),
            cache_dir: value.stake_cache_dir.unwrap_or(defaults.cache_dir),
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
