//! Tracing initialization.
//!
//! Logs go to stderr so that reports printed on stdout stay clean for piping.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Environment variable holding the log filter, e.g. `ETF_MAD_LOG=etf_mad::data=debug`.
pub const LOG_ENV: &str = "ETF_MAD_LOG";

/// Initialize the global tracing subscriber.
///
/// Falls back to `etf_mad=info` when `ETF_MAD_LOG` is unset or invalid.
/// Safe to call more than once, and leaves an already installed global
/// subscriber in place.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("etf_mad=info"));

        let installed = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .try_init();

        if let Err(err) = installed {
            tracing::debug!(error = %err, "global tracing subscriber already set");
        }
    });
}
