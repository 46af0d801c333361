//! Router and dispatch configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Prefix removed from every request path, e.g. `/blog`
    pub base_path: String,
    /// Prefix for relative redirect locations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_url: Option<String>,
}

impl RouterSettings {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        if let Some(base) = var(super::ENV_BASE_PATH) {
            self.base_path = base;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.site_url {
            if !url.contains("://") {
                bail!("router.site_url must be an absolute URL, got '{}'", url);
            }
        }
        Ok(())
    }
}
