//! Logging infrastructure for harrow
//!
//! Structured logging via `tracing`. Every harrow crate logs through the
//! `tracing` macros; the binary installs the subscriber once at startup.

use std::time::Duration;
use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_DIRECTIVES: &str = "warn";
const VERBOSE_DIRECTIVES: &str = "harrow=debug,harrow_engine=debug,harrow_drivers=debug,harrow_store=debug,harrow_runner=debug,info";

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the compact format only shows
/// warnings, and `verbose` switches to debug output for harrow crates with
/// targets and span-close timing.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new(VERBOSE_DIRECTIVES)
            } else {
                EnvFilter::try_new(DEFAULT_DIRECTIVES)
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(true)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one driver invocation (`test`, `list`, `debug`, `report`).
pub fn driver_span(driver: &str, suite: &str) -> tracing::Span {
    span!(Level::INFO, "driver", driver = %driver, suite = %suite)
}

/// Render a duration the way results are printed: seconds with millisecond
/// precision.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    format!("{}.{:03}s", duration.as_secs(), duration.subsec_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0.000s");
        assert_eq!(format_duration(Duration::from_millis(1234)), "1.234s");
        assert_eq!(format_duration(Duration::from_secs(61)), "61.000s");
    }

    #[test]
    fn test_driver_span_is_constructible_without_subscriber() {
        let span = driver_span("test", "suite");
        let _guard = span.enter();
    }
}
