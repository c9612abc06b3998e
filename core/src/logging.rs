//! logging.rs
//! `tracing` subscriber setup.
//!
//! - `OBFS_LOG_LEVEL`: filter directive (trace/debug/info/warn/error or a full
//!   `EnvFilter` string), default from the `level` argument.
//! - `OBFS_LOG_FORMAT`: `text` or `json`, default from the `format` argument.
//!
//! Events keep bracketed tags (`[UPLOAD]`, `[POOL]`, ...) in their messages.

use tracing_subscriber::{fmt, EnvFilter};

use crate::constants::{ENV_LOG_FORMAT, ENV_LOG_LEVEL};

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_logging(level: &str, format: &str) -> bool {
    let filter = EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(ENV_LOG_FORMAT).unwrap_or_else(|_| format.to_string());

    let installed = match format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        _ => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    installed.is_ok()
}

/// Subscriber for tests: captured by the test harness, ignores double init.
pub fn init_test_logging() {
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_env(ENV_LOG_LEVEL).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_test_writer()
        .try_init();
}

pub fn log_level_valid(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

pub fn log_format_valid(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_and_format_names() {
        assert!(log_level_valid("debug"));
        assert!(!log_level_valid("INFO"));
        assert!(log_format_valid("json"));
        assert!(!log_format_valid("xml"));
    }

    #[test]
    fn second_init_is_reported_not_fatal() {
        init_test_logging();
        assert!(!init_logging("info", "text"));
    }
}
