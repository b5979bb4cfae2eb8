//! Development-time tracing for debugging the orchestrators.
//!
//! Dev diagnostics only: output goes to stderr via `RUST_LOG`, nothing is
//! persisted. The orchestrators emit events for proposals, retries, and
//! stops; callers decide whether to install a subscriber.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
