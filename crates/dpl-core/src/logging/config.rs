//! Logging configuration.
//!
//! Precedence, lowest to highest: built-in defaults (human, warn), then
//! `DPL_LOG` / `DPL_LOG_FORMAT`, then `-v`/`-q` and `--log-format`.
//! `RUST_LOG` is handled later by the filter itself and wins over all of them.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const ENV_LOG_LEVEL: &str = "DPL_LOG";
pub const ENV_LOG_FORMAT: &str = "DPL_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines on stderr.
    #[default]
    #[value(aliases = ["console", "pretty"])]
    Human,
    /// One JSON object per line on stderr.
    #[value(alias = "json")]
    Jsonl,
}

/// Minimum level of emitted events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    #[value(alias = "warning")]
    Warn,
    Error,
    /// Nothing at all.
    #[value(aliases = ["none", "quiet"])]
    Off,
}

/// Parse a `ValueEnum` the way the command line does, ignoring case.
fn parse_value<T: ValueEnum>(raw: &str) -> Option<T> {
    T::from_str(raw.trim(), true).ok()
}

fn write_name<T: ValueEnum>(value: &T, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match value.to_possible_value() {
        Some(v) => f.write_str(v.get_name()),
        None => Ok(()),
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_name(self, f)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_name(self, f)
    }
}

impl LogLevel {
    /// Level implied by `-v` / `-q`, if either was given.
    pub fn from_flags(verbose: u8, quiet: bool) -> Option<Self> {
        match (quiet, verbose) {
            (true, _) => Some(LogLevel::Off),
            (false, 0) => None,
            (false, 1) => Some(LogLevel::Info),
            (false, 2) => Some(LogLevel::Debug),
            (false, _) => Some(LogLevel::Trace),
        }
    }
}

/// Effective logging settings for one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Prefix human lines with a timestamp.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::default(),
            level: LogLevel::default(),
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Settings from the process environment and command-line flags.
    pub fn from_cli(verbose: u8, quiet: bool, format: Option<LogFormat>) -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), verbose, quiet, format)
    }

    /// Like [`LogConfig::from_cli`] with an explicit environment lookup.
    ///
    /// Unparsable environment values are ignored.
    pub fn from_lookup<F>(env: F, verbose: u8, quiet: bool, format: Option<LogFormat>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_level = env(ENV_LOG_LEVEL).and_then(|v| parse_value(&v));
        let env_format = env(ENV_LOG_FORMAT).and_then(|v| parse_value(&v));

        LogConfig {
            format: format.or(env_format).unwrap_or_default(),
            level: LogLevel::from_flags(verbose, quiet)
                .or(env_level)
                .unwrap_or_default(),
            timestamps: true,
        }
    }
}
