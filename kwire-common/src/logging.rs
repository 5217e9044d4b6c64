//! `tracing` subscriber setup for binaries and tests.

use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Installs a stderr subscriber filtered at `level`.
///
/// Returns `false` when a global subscriber was already installed, which
/// happens when several tests in one process ask for logging.
pub fn init_logging(level: Level) -> bool {
    let formatting_layer = fmt::layer()
        .with_ansi(true)
        .with_level(true)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::filter::LevelFilter::from_level(level);

    tracing_subscriber::registry()
        .with(formatting_layer)
        .with(filter_layer)
        .try_init()
        .is_ok()
}
