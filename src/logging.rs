// src/logging.rs
// =============================================================================
// Log output goes to stderr through tracing-subscriber, so stdout stays
// clean for command output (paths, tables, JSON).
//
// Level: info, or debug with --debug. RUST_LOG overrides both.
// =============================================================================

use tracing_subscriber::EnvFilter;

pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("debug mode on");
}
