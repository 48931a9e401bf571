//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVE: &str = "prometheus_request_gate=info";

/// Initialize tracing/telemetry. Users can install their own subscriber; this
/// helper installs an env-filtered `fmt` subscriber if none is set, falling
/// back to `info` for this crate when `RUST_LOG` is absent.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
