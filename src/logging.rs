//! Structured diagnostics via `tracing`.
//!
//! Console lines meant for the operator go through the colored macros in the
//! crate root. Everything here is diagnostic output written to stderr, so it
//! never interleaves with the run summary on stdout.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Parses a level name as accepted by `--log-level`.
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(format!(
            "Invalid log level '{other}'. Must be one of: trace, debug, info, warn, error"
        )),
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set. With `json` every event
/// is emitted as one JSON object per line.
///
/// # Errors
///
/// Returns an error for an unknown level or when a subscriber is already set.
pub fn init_logging(level: &str, json: bool) -> Result<(), String> {
    let level = parse_log_level(level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("plarchive={}", level.as_str().to_lowercase())));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| format!("Failed to initialize logging: {e}"))
}
