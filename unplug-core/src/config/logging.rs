//! Logging configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::{LogFormat, LogLevel, LogOutput, LoggingConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
    pub output: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "human".to_string(), output: "stderr".to_string() }
    }
}

impl LoggingSettings {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, var: &dyn Fn(&str) -> Option<String>) {
        if let Some(level) = var(super::ENV_LOG_LEVEL) {
            self.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.to_logging_config().map(|_| ())
    }

    pub fn to_logging_config(&self) -> Result<LoggingConfig> {
        let level: LogLevel = self.level.parse().context("invalid logging.level")?;
        let format: LogFormat = self.format.parse().context("invalid logging.format")?;
        let output: LogOutput = self.output.parse().context("invalid logging.output")?;

        Ok(LoggingConfig::default().with_level(level).with_format(format).with_output(output))
    }
}
