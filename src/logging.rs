//! Logging and tracing setup.
//!
//! All logs go to **stderr** so stdout stays free for whatever host drives
//! the provider. Lifecycle operations open `tracing` spans carrying the
//! resource type and identity; secrets are never recorded.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `debug`, `dbtcloud_provider=debug`)
//!
//! # Examples
//!
//! ```bash
//! # Show every request sent to dbt Cloud
//! RUST_LOG=dbtcloud_provider::client=debug ./my-host
//! ```

use tracing_subscriber::{fmt, prelude::*, registry::LookupSpan, EnvFilter, Layer};

fn stderr_layer<S>() -> impl Layer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG` and defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`], with the level used when `RUST_LOG` is unset.
///
/// # Example
///
/// ```ignore
/// dbtcloud_provider::init_logging_with_default("debug");
/// ```
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Useful in tests, where several cases may race to install a subscriber.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}
