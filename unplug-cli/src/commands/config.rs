use std::io::Write;

use unplug_core::config::UnplugConfig;

pub fn run(config: &UnplugConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    match &config.source {
        Some(source) => writeln!(out, "# loaded from {}", source.display())?,
        None => writeln!(out, "# no unplug.toml found, using defaults")?,
    }
    write!(out, "{}", config.to_toml()?)?;
    Ok(())
}
