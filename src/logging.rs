//! Logging setup.
//!
//! Structured logging via `tracing`. The default filter is `info`, raised for
//! this crate by `--debug`. `DRIVEUP_LOG` overrides the filter entirely, and
//! `DRIVEUP_LOG_FORMAT` switches between `text` and `json` output. Everything
//! goes to stderr.

use crate::error::UploadError;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initialize the global subscriber. Call once, before any work starts.
pub fn init(debug: bool) -> Result<(), UploadError> {
    let filter = build_env_filter(debug);
    let base = Registry::default().with(filter);

    if determine_format()? == "json" {
        base.with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr),
        )
        .init();
    } else {
        base.with(
            fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_writer(std::io::stderr),
        )
        .init();
    }

    Ok(())
}

fn build_env_filter(debug: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env("DRIVEUP_LOG") {
        return filter;
    }
    if debug {
        EnvFilter::new("info,driveup=debug")
    } else {
        EnvFilter::new("info")
    }
}

fn determine_format() -> Result<String, UploadError> {
    match std::env::var("DRIVEUP_LOG_FORMAT") {
        Err(_) => Ok("text".to_string()),
        Ok(format) if format == "text" || format == "json" => Ok(format),
        Ok(other) => Err(UploadError::ConfigError(format!(
            "invalid log format: {} (must be 'text' or 'json')",
            other
        ))),
    }
}
