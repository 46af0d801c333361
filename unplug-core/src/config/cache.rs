//! Cache configuration

use std::path::Path;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheConfig, FlushPolicy, DEFAULT_CACHE_DIR, DEFAULT_REWRITE_FILE, DEFAULT_TYPES};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub dir: String,
    pub types: Vec<String>,
    pub cache_unknown_types: bool,
    pub rewrite_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_from: Option<String>,
    pub flush_policy: FlushPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: DEFAULT_CACHE_DIR.to_string(),
            types: DEFAULT_TYPES.iter().map(|t| t.to_string()).collect(),
            cache_unknown_types: false,
            rewrite_file: DEFAULT_REWRITE_FILE.to_string(),
            search_from: None,
            flush_policy: FlushPolicy::default(),
        }
    }
}

impl CacheSettings {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        if let Some(on) = var(super::ENV_CACHE_ON) {
            match parse_flag(&on) {
                Some(enabled) => self.enabled = enabled,
                None => log::warn!("Ignoring {}={}, expected on/off", super::ENV_CACHE_ON, on),
            }
        }
        if let Some(dir) = var(super::ENV_CACHE_DIR) {
            self.dir = dir;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dir.trim().is_empty() {
            bail!("cache.dir must not be empty");
        }
        if self.types.is_empty() {
            bail!("cache.types must list at least one extension");
        }
        if self.rewrite_file.trim().is_empty() {
            bail!("cache.rewrite_file must not be empty");
        }
        Ok(())
    }

    /// Cache options with relative paths resolved against `base`
    pub fn to_cache_config(&self, base: &Path) -> CacheConfig {
        let mut config = CacheConfig::new(base.join(&self.dir))
            .with_types(self.types.iter().cloned())
            .with_cache_unknown_types(self.cache_unknown_types)
            .with_rewrite_file(self.rewrite_file.clone())
            .with_flush_policy(self.flush_policy);
        if let Some(start) = &self.search_from {
            config = config.with_search_from(base.join(start));
        }
        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
