//! Logging setup using `tracing-subscriber`.
//!
//! Human-readable output to stderr, controlled by the `RUST_LOG`
//! environment variable (default: `info`).

use tracing_subscriber::EnvFilter;

/// Initialise stderr logging for the CLI.
///
/// Safe to call once per process; later calls are ignored.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
