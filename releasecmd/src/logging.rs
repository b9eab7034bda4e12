//! Diagnostic tracing for `releasecmd`.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: developer diagnostics via `RUST_LOG`, output to
//!   stderr. Not part of the product output.
//!
//! - **Release output**: step announcements (`[push git tags]`), dry-run
//!   command lines and `[ERROR]` lines, always printed and unaffected by
//!   `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn`, or `releasecmd=debug` when `verbose`.
///
/// # Example
/// ```bash
/// RUST_LOG=releasecmd=trace releasecmd --dry-run
/// ```
pub fn init(verbose: bool) {
    let default = if verbose { "warn,releasecmd=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
