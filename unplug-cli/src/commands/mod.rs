pub mod config;
pub mod flush;
pub mod lookup;
pub mod rules;

use unplug_core::config::UnplugConfig;
use unplug_core::Cache;

/// Open the cache described by `config`
pub fn open_cache(config: &UnplugConfig) -> anyhow::Result<Cache> {
    Ok(Cache::new(config.cache_config())?)
}
