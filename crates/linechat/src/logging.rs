//! Tracing setup for applications built on linechat.
//!
//! The library itself only emits `tracing` events. Binaries and tests that
//! want to see them call [`init_tracing`] once at startup.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_filter` is used, e.g.
/// `"info"` or `"linechat=debug"`. Returns `false` if a global subscriber
/// was already installed, in which case nothing changes.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt().with_env_filter(filter).with_target(false).try_init().is_ok()
}
