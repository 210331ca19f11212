//! Structured diagnostics via `tracing`. The column-generation progress row
//! (phase, iteration, objective, lower bound, new columns) is emitted as a
//! structured event from `cg::run` rather than a separate printed table.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a `tracing-subscriber` registry reading `RUST_LOG` (defaulting to
/// `info`), matching the pack's own `EnvFilter::from_default_env()` idiom.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
}
