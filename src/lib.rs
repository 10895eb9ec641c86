pub mod collector;
pub mod config;
pub mod demo;
pub mod error;
pub mod event_log;
pub mod gc;
pub mod handlers;
pub mod hooks;
pub mod invoke;
pub mod record;
pub mod server;
pub mod snapshot;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging. Call once from the binary.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
