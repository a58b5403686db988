//! Tracing setup for binaries embedding SessionWard.

use tracing_subscriber::EnvFilter;

use crate::SessionwardError;

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` is used
/// (e.g. `"info,sessionward_reaper=debug"`).
///
/// # Errors
/// [`SessionwardError::Tracing`] if a global subscriber is already set.
pub fn init_tracing(default_filter: &str) -> Result<(), SessionwardError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| SessionwardError::Tracing(e.to_string()))
}
