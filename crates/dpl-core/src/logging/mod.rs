//! Structured logging for dpl.
//!
//! Command payloads own stdout; every log line goes to stderr, either as
//! human-readable text or as JSON lines. Pipeline events carry `run_id`,
//! `stage` and an `event` name from [`event_names`].

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, LogContext, Stage};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directives for our own crates at `level`.
fn default_directives(level: LogLevel) -> String {
    format!("dpl_core={0},dpl={0},dpl_config={0}", level)
}

/// Install the global subscriber on stderr.
///
/// `RUST_LOG`, when set and valid, replaces the level-derived filter
/// entirely. Only the first call has an effect.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.level)));

    let human = config.format == LogFormat::Human;
    let ansi = std::io::stderr().is_terminal();
    let timed = (human && config.timestamps).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(ansi)
    });
    let untimed = (human && !config.timestamps).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(ansi)
            .without_time()
    });

    let jsonl = (config.format == LogFormat::Jsonl).then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_writer(std::io::stderr)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(timed)
        .with(untimed)
        .with(jsonl)
        .try_init();
}

/// Fresh `run-` id of 12 hex digits.
pub fn generate_run_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(12);
    format!("run-{}", id)
}
