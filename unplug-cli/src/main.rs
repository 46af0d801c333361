//! Unplug CLI: inspect and maintain a site's response cache.
//!
//! ```bash
//! unplug rules                 # list the managed rewrite rules
//! unplug lookup /post/hello    # which file would the web server send?
//! unplug flush --files         # drop every rule and every cached body
//! unplug config                # print the effective configuration
//! ```
//!
//! Configuration is read from `--config`, or the nearest `unplug.toml` at or
//! above the current directory.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use unplug_core::config::UnplugConfig;
use unplug_core::logging::init_logging;

#[derive(Parser)]
#[command(name = "unplug", about = "Unplug response cache maintenance", version)]
struct Cli {
    /// Configuration file (default: nearest unplug.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove every managed rewrite rule
    Flush {
        /// Also delete the cached response files
        #[arg(long)]
        files: bool,
    },
    /// List the managed rewrite rules
    Rules,
    /// Show the cached file that would answer a request path
    Lookup {
        /// Request path, e.g. /post/hello
        path: String,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<UnplugConfig> {
    let config = match path {
        Some(path) => UnplugConfig::load_from(path)?,
        None => UnplugConfig::discover(std::env::current_dir().context("no current directory")?)?,
    };
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config)?;
    init_logging(&config.logging_config()?)?;

    if let Some(source) = &config.source {
        log::debug!("Using configuration from {}", source.display());
    }

    let mut out = io::stdout().lock();
    match cli.command {
        Commands::Flush { files } => commands::flush::run(&config, files, &mut out),
        Commands::Rules => commands::rules::run(&config, &mut out),
        Commands::Lookup { path } => commands::lookup::run(&config, &path, &mut out),
        Commands::Config => commands::config::run(&config, &mut out),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
