//! Logging setup.
//!
//! Logs go to **stderr**; stdout carries only the handshake line.
//!
//! ```bash
//! # Default: info
//! ./hemmer-provider-iot
//!
//! # Retry attempts and request dumps
//! RUST_LOG=hemmer_provider_iot=debug ./hemmer-provider-iot
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber, filtering by `RUST_LOG` or `info`.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`], with `default_level` used when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_logging_with_default(default_level: &str) {
    if !install(default_level) {
        panic!("a global tracing subscriber is already installed");
    }
}

/// Install the global subscriber unless one already is. Returns whether this
/// call installed it.
pub fn try_init_logging() -> bool {
    install("info")
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn install(default_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so only the
    // filter is exercised here.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("hemmer_provider_iot=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_provider_iot::retry=debug").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        try_init_logging();
        assert!(!try_init_logging());
    }
}
