//! Process-wide tracing setup.
//!
//! Hosts embedding this crate usually install their own subscriber; these
//! helpers cover binaries and tests that just want sensible output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a human-readable subscriber.
///
/// `RUST_LOG` takes precedence over `default_directives`. Calling this when
/// a subscriber is already installed is a no-op.
pub fn init_logging(default_directives: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives.into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Install a JSON subscriber for log shippers.
pub fn init_json_logging(default_directives: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives.into());
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init();
}
