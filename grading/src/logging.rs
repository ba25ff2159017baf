//! Diagnostic tracing to stderr.
//!
//! Trial records and reports written by the eval harness are product output
//! and are unaffected by the filter configured here.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset, or `debug` when `verbose`.
///
/// # Example
/// ```bash
/// RUST_LOG=grading=debug cargo run -p eval -- run spec-quality
/// ```
pub fn init(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
