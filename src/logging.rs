//! Tracing setup for hosts embedding the tracker

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize a subscriber with env-filter support.
///
/// `default_level` applies when `RUST_LOG` is unset, e.g. `"info"` or
/// `"bridge_tracker=debug"`. Hosts that install their own subscriber can
/// skip this entirely.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stdout_layer = fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .init();
}
