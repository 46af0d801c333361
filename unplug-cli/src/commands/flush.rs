use std::io::Write;

use unplug_core::config::UnplugConfig;
use unplug_core::FlushPolicy;

use super::open_cache;

/// Empty the managed rules section; `files` forces the cached bodies out too
pub fn run(config: &UnplugConfig, files: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    let cache = open_cache(config)?;
    let policy = if files { FlushPolicy::RulesAndFiles } else { config.cache.flush_policy };

    let removed = cache.flush_with(policy)?;
    writeln!(out, "Removed {} rule lines from {}", removed, cache.rewrite_file_path().display())?;
    if policy == FlushPolicy::RulesAndFiles {
        writeln!(out, "Emptied {}", cache.dir().display())?;
    }
    Ok(())
}
