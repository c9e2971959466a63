//! Structured logging setup for embedding applications.
//!
//! The library itself only emits `tracing` events; nothing is printed
//! unless the host installs a subscriber, either its own or the one from
//! [`init_logging`].
//!
//! - stderr receives all log output (human or JSONL)
//! - debug: construction and parameter solving
//! - trace: every update
//! - info: a verdict latching
//! - warn: contradictory ternary sub-test verdicts

pub mod config;

pub use config::{LogConfig, LogFormat, LogLevel};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global subscriber for `config`.
///
/// Returns `false` when a global subscriber was already installed, which
/// is not an error: tests and hosts may race to initialize.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("stmc_core={}", config.level)));

    let installed = match config.format {
        LogFormat::Human => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init()
        }
    };
    installed.is_ok()
}

/// Initialize logging from the environment alone.
pub fn init_default_logging() -> bool {
    init_logging(&LogConfig::from_env(None, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reinitialization_is_tolerated() {
        let config = LogConfig::default().with_level(LogLevel::Off);
        // Another test may have won the race for the first install.
        let _ = init_logging(&config);
        assert!(!init_logging(&config.clone().with_format(LogFormat::Jsonl)));
        assert!(!init_default_logging());
    }
}
