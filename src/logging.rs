//! Logging and tracing configuration for UFDR-Extract
//!
//! Structured logging through the `tracing` crate. The engine itself only
//! emits events; the binary (or any embedding application) installs the
//! subscriber.
//!
//! # Log Levels
//!
//! - `warn`  - An artifact, table or document was skipped
//! - `info`  - Per-container summary (default in release)
//! - `debug` - Per-artifact and per-category decisions (default in debug builds)
//! - `trace` - Per-row drops and ignored entries
//!
//! # Environment Variable Control
//!
//! ```bash
//! RUST_LOG=debug ufdr-extract case.ufdr                        # All debug logs
//! RUST_LOG=ufdr_extract=trace ufdr-extract case.ufdr           # Trace for this crate only
//! RUST_LOG=ufdr_extract::extract::relational=debug ufdr-extract case.ufdr
//! ```

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging/tracing system
///
/// Logs go to stderr so stdout stays clean for JSON output. A second call
/// is ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("ufdr_extract=debug")
        } else {
            EnvFilter::new("ufdr_extract=info")
        }
    });

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact(),
    );

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Initialize logging with verbose output (file:line, trace level)
pub fn init_verbose() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ufdr_extract=trace"));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty(),
    );

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Check if debug logging is enabled
/// Can be used to skip expensive debug computations
#[inline]
pub fn is_debug_enabled() -> bool {
    tracing::enabled!(Level::DEBUG)
}
