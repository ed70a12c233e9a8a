//! Logging setup for the command-line binary.
//!
//! Events go to stderr so stdout stays clean for tables, CSV and JSON.
//! `RUST_LOG` overrides the default level when set.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. `verbose` lowers the default level to `debug`.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "tallyup=debug" } else { "tallyup=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Fails only when a subscriber is already installed; keep the first one.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .without_time(),
        )
        .try_init();
}
