use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::config::{CommonConfig, PathSet};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogsConfig {
    #[serde(default = "LogsConfig::default_level")]
    pub level: LogLevel,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "debug")]
    Debug,
}

impl CommonConfig for LogsConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }

    fn complete(&mut self, _ps: &PathSet) -> Result<()> {
        Ok(())
    }
}

impl LogsConfig {
    pub fn default_level() -> LogLevel {
        LogLevel::Info
    }

    pub fn init(&self) -> Result<()> {
        let level = match self.level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
        };

        let is_terminal = io::stdout().is_terminal();

        let colors = ColoredLevelConfig::new()
            .info(Color::Green)
            .warn(Color::Yellow)
            .debug(Color::Magenta);

        fern::Dispatch::new()
            .format(move |out, message, record| {
                let now = humantime::format_rfc3339_millis(std::time::SystemTime::now());
                if is_terminal {
                    out.finish(format_args!(
                        "{} [{}] {}",
                        now,
                        colors.color(record.level()),
                        message
                    ))
                } else {
                    out.finish(format_args!("{} [{}] {}", now, record.level(), message))
                }
            })
            .level(level)
            // actix logs every connection at info level, too noisy for us
            .level_for("actix_server", LevelFilter::Warn)
            .chain(io::stdout())
            .apply()
            .context("init logger")?;

        Ok(())
    }
}
