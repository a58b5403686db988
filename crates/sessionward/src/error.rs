//! Unified error type for SessionWard.

use sessionward_reaper::ReaperError;
use sessionward_session::SessionError;

/// Top-level error that wraps all crate-specific errors.
///
/// Applications using the `sessionward` crate can return this single type
/// and let `?` convert sub-crate errors through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum SessionwardError {
    /// A session-level error (not found, ID generation).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The reaper task did not stop cleanly.
    #[error(transparent)]
    Reaper(#[from] ReaperError),

    /// The global tracing subscriber could not be installed.
    #[error("failed to initialise tracing: {0}")]
    Tracing(String),
}
