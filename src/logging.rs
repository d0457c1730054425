//! Subscriber setup for applications.
//!
//! The library crates only emit `tracing` events; binaries call [`init`]
//! once at startup to print them.

use serde::{Deserialize, Serialize};
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(crate::Error::InvalidConfig(format!(
                "unknown log level '{other}'"
            ))),
        }
    }
}

/// Install a formatted stderr subscriber. Returns false if one was already set.
pub fn init(level: LogLevel) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(Level::from(level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
