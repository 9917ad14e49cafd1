//! Logging System
//!
//! Structured logging via the `tracing` crate. Log lines go to stderr so
//! they never mix with the operation output on stdout; `RUST_LOG` overrides
//! the level chosen by the CLI flags.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Resolve the filter directive from the verbosity flags. `RUST_LOG` wins
/// when set.
pub fn resolve_filter(verbose: bool, debug: bool) -> EnvFilter {
    let default = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize the global subscriber. Safe to call once per process; later
/// calls are ignored so tests can initialize freely.
pub fn init(verbose: bool, debug: bool) {
    let filter = resolve_filter(verbose, debug);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = Registry::default().with(filter).with(layer).try_init();
}
