//! Error types for the session layer.

use crate::SessionId;

/// Errors that can occur during session management.
///
/// Both variants are recoverable by the caller: a missing session usually
/// means "authenticate again", a failed ID generation can simply be retried.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live session exists for the given ID.
    /// Either it was never created, it was deleted, or the reaper evicted it.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The ID generator failed to produce a usable session ID.
    #[error("failed to generate session id: {0}")]
    IdGeneration(String),
}
