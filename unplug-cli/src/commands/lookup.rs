use std::io::Write;

use unplug_core::config::UnplugConfig;
use unplug_core::{Request, Router};

use super::open_cache;

/// Print the cached file for `path`, resolved the same way a request is
pub fn run(config: &UnplugConfig, path: &str, out: &mut dyn Write) -> anyhow::Result<()> {
    let cache = open_cache(config)?;

    let mut router = Router::new();
    router.base(&config.router.base_path);
    let request_path = router.request_path(Request::get(path).path());

    match cache.lookup(&request_path) {
        Some(entry) => {
            writeln!(out, "{} ({})", entry.path().display(), entry.content_type())?;
        }
        None => writeln!(out, "{} is not cached", request_path)?,
    }
    Ok(())
}
