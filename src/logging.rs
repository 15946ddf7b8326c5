//! Tracing subscriber setup for the binary

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install the global `fmt` subscriber once
///
/// Log lines go to stderr so report output on stdout stays machine-readable.
/// `RUST_LOG` overrides the default `budget_ledger=info` filter.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("budget_ledger=info"));

        // Another subscriber may already be installed by an embedding program
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
