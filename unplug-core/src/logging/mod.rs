//! Logging backend for the standard `log` crate
//!
//! Everything in Unplug logs through `log::debug!`/`info!`/`warn!`. A host
//! that already installs its own logger can ignore this module; otherwise
//! call [`init_logging`] once at startup.
//!
//! # Example
//!
//! ```rust,no_run
//! use unplug_core::logging::{init_logging, LoggingConfig};
//!
//! let config = LoggingConfig::production().with_context_field("site", "example.com");
//! init_logging(&config)?;
//!
//! log::info!("Cache ready");
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod formatter;

pub use config::{LogLevel, LogOutput, LoggingConfig};
pub use formatter::{LogEntry, LogFormat};

use std::io::{self, Write};
use std::sync::Once;

use serde_json::Value;

static INIT: Once = Once::new();

/// Install the Unplug logger as the global `log` backend.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = install(config);
    });
    result
}

fn install(config: &LoggingConfig) -> anyhow::Result<()> {
    log::set_boxed_logger(Box::new(UnplugLogger::new(config.clone())))?;
    log::set_max_level(config.level.into());
    Ok(())
}

struct UnplugLogger {
    config: LoggingConfig,
}

impl UnplugLogger {
    fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    fn entry(&self, record: &log::Record) -> LogEntry {
        let mut entry = LogEntry::new(
            record.level().into(),
            record.args().to_string(),
            record.target().to_string(),
        );
        for (key, value) in &self.config.context_fields {
            entry = entry.with_field(key, Value::String(value.clone()));
        }
        entry
    }
}

impl log::Log for UnplugLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        LogLevel::from(metadata.level()) <= self.config.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = self.config.format.format_entry(&self.entry(record));
        let _ = match self.config.output {
            LogOutput::Stdout => writeln!(io::stdout().lock(), "{}", line),
            LogOutput::Stderr => writeln!(io::stderr().lock(), "{}", line),
        };
    }

    fn flush(&self) {
        let _ = match self.config.output {
            LogOutput::Stdout => io::stdout().flush(),
            LogOutput::Stderr => io::stderr().flush(),
        };
    }
}
