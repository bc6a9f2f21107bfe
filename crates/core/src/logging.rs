//! Logging initialization and configuration.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging system with tracing.
///
/// Filtering comes from `RUST_LOG` when set, otherwise the engine crates
/// log at debug level and everything else at info.
///
/// # Example
/// ```
/// helio_core::init_logging();
/// tracing::info!("Renderer initialized");
/// ```
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,helio=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
