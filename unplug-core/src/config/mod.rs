//! Configuration system for Unplug
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Environment variables** (`UNPLUG_CACHE_ON`, `UNPLUG_CACHE_DIR`,
//!    `UNPLUG_BASE_PATH`, `UNPLUG_LOG_LEVEL`)
//! 2. **Config file** (`unplug.toml`)
//! 3. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use unplug_core::config::UnplugConfig;
//!
//! // nearest unplug.toml at or above the current directory
//! let config = UnplugConfig::discover(std::env::current_dir()?)?;
//! config.validate()?;
//! let cache_config = config.cache_config();
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ```toml
//! [cache]
//! dir = "_unplug_cache"
//! types = ["html", "xml", "json"]
//! flush_policy = "rules_only"
//!
//! [router]
//! base_path = "/blog"
//!
//! [logging]
//! level = "debug"
//! ```

pub mod cache;
pub mod logging;
pub mod router;

pub use cache::CacheSettings;
pub use logging::LoggingSettings;
pub use router::RouterSettings;

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::dispatch::DispatchConfig;
use crate::logging::LoggingConfig;

/// File name looked for by [`UnplugConfig::discover`]
pub const CONFIG_FILE: &str = "unplug.toml";

pub const ENV_CACHE_ON: &str = "UNPLUG_CACHE_ON";
pub const ENV_CACHE_DIR: &str = "UNPLUG_CACHE_DIR";
pub const ENV_BASE_PATH: &str = "UNPLUG_BASE_PATH";
pub const ENV_LOG_LEVEL: &str = "UNPLUG_LOG_LEVEL";

/// Complete Unplug configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnplugConfig {
    pub cache: CacheSettings,
    pub router: RouterSettings,
    pub logging: LoggingSettings,
    /// File this configuration was loaded from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl UnplugConfig {
    /// Defaults, then `path` if it exists, then the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load the nearest `unplug.toml` at or above `start`, or defaults plus
    /// environment when there is none
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let found = start
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file());

        match found {
            Some(path) => Self::load_from(path),
            None => {
                let mut config = Self::default();
                config.apply_env_vars();
                Ok(config)
            }
        }
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.cache.merge(other.cache);
        self.router.merge(other.router);
        self.logging.merge(other.logging);
        if other.source.is_some() {
            self.source = other.source;
        }
    }

    /// Apply environment variables to configuration
    pub fn apply_env_vars(&mut self) {
        self.apply_env(&|name| env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        self.cache.apply_env(var);
        self.router.apply_env(var);
        self.logging.apply_env(var);
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.router.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Directory relative paths are resolved against: the config file's
    /// directory, or the current directory
    pub fn base_dir(&self) -> PathBuf {
        self.source
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn cache_config(&self) -> CacheConfig {
        self.cache.to_cache_config(&self.base_dir())
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig { cache_enabled: self.cache.enabled, site_url: self.router.site_url.clone() }
    }

    pub fn logging_config(&self) -> Result<LoggingConfig> {
        self.logging.to_logging_config()
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
