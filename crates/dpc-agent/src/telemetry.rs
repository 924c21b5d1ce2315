//! Tracing initialization for hosts.

use tracing_subscriber::EnvFilter;

/// Initializes a process-wide tracing subscriber.
///
/// The filter comes from the standard environment variable, defaulting to
/// `info`. A second call is a no-op, so hosts may call this from every
/// embedding entry point.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
