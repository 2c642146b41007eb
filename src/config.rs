//! User configuration
//!
//! Settings are read from `config.json` in the system's standard config
//! directory. Every field is optional in the file; missing ones take their
//! defaults. `TMDB_API_KEY` overrides the stored API key and
//! `EMBED_RESOLVER_CONFIG` points at a different config file.

use crate::content::DEFAULT_LANGUAGE;
use crate::resolver::UnknownProviderPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the TMDB API key
pub const API_KEY_ENV: &str = "TMDB_API_KEY";

/// Environment variable pointing at an alternative config file
pub const CONFIG_PATH_ENV: &str = "EMBED_RESOLVER_CONFIG";

/// Errors that can occur while loading or saving the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine config directory location
    #[error("Failed to determine config directory location")]
    ConfigDirectoryNotFound,

    /// Failed to read the config file
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the config file
    #[error("Failed to write config file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this structure
    #[error("Invalid config file {path}: {source}")]
    Invalid {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Persisted settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TMDB v3 API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_api_key: Option<String>,
    /// Provider selected when none is given
    pub default_provider: Option<String>,
    /// Language code for providers that support one
    pub language: String,
    /// Ask providers to start playback immediately
    pub autoplay: bool,
    /// Ask providers to suppress ads
    pub ad_free: bool,
    /// What to do with provider ids that are not in the catalog
    pub unknown_provider: UnknownProviderPolicy,
    /// Custom catalog file replacing the built-in one
    pub catalog_path: Option<PathBuf>,
    /// How long fetched content details stay cached
    pub cache_ttl_hours: u64,
    /// Timeout for every metadata request
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            default_provider: None,
            language: DEFAULT_LANGUAGE.to_string(),
            autoplay: true,
            ad_free: true,
            unknown_provider: UnknownProviderPolicy::default(),
            catalog_path: None,
            cache_ttl_hours: 24,
            request_timeout_secs: 15,
        }
    }
}

impl Config {
    /// Loads the configuration from its default location
    ///
    /// A missing file yields the defaults. Environment overrides are applied
    /// afterwards.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env(env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Loads the configuration from an explicit file, without env overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Writes the configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_failed = |source| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, content).map_err(write_failed)
    }

    /// Location of the config file
    pub fn path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.json"))
            .ok_or(ConfigError::ConfigDirectoryNotFound)
    }

    /// Applies the API key from the environment, ignoring blank values
    fn apply_env(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.tmdb_api_key = Some(key);
        }
    }

    /// Cache lifetime for content details
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours.saturating_mul(60 * 60))
    }

    /// Timeout for metadata requests
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Standard directories of this application
pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "embed-resolver", "embed-resolver")
}
