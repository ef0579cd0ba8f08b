//! Logging infrastructure for the subtitle engine.
//!
//! Codecs report tolerated anomalies (skipped sections, dropped indices,
//! ignored voice tags...) through `tracing`. This module wires a
//! subscriber for callers that do not bring their own.
//!
//! # Example
//!
//! ```no_run
//! use subkit_core::logging::{init_tracing_with, LogConfig, LogLevel};
//!
//! let mut config = LogConfig::default();
//! config.level = LogLevel::Debug;
//! init_tracing_with(&config);
//! ```

mod types;

pub use types::{LogConfig, LogLevel};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber with the provided default level.
///
/// `RUST_LOG` takes precedence over `default_level` when set.
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    init_tracing_with(&LogConfig {
        level: default_level,
        ..LogConfig::default()
    });
}

/// Initialize global tracing subscriber from a [`LogConfig`].
pub fn init_tracing_with(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(config.level)));

    let layer = fmt::layer()
        .with_target(config.show_target)
        .with_thread_ids(false)
        .with_ansi(config.ansi);

    if config.show_timestamps {
        tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(layer.without_time())
            .with(filter)
            .init();
    }
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

/// Convert LogLevel to filter string.
fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}
