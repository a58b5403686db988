//! Session types: the data structures that represent one user's state.
//!
//! A "session" is the server's record of a user between requests. It tracks:
//! - WHO it belongs to (an opaque `SessionId`)
//! - WHAT the caller stored (`SessionData`, never inspected here)
//! - WHEN it was last active (so the reaper knows when to evict it)

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// An opaque identifier for a session.
///
/// Newtype over `String` so a session ID can't be confused with an
/// arbitrary string key inside [`SessionData`]. Serializes as the bare
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a raw ID string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID and returns the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

// ---------------------------------------------------------------------------
// SessionData
// ---------------------------------------------------------------------------

/// The caller-owned payload of a session.
///
/// Values are arbitrary JSON so callers can store anything serializable.
/// The store replaces the whole map on update and hands out clones on read.
pub type SessionData = HashMap<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single session record.
///
/// Only [`SessionStore`](crate::SessionStore) builds or mutates these, so a
/// session sitting in the map is always fully initialized.
#[derive(Debug, Clone)]
pub struct Session {
    data: SessionData,
    last_active: Instant,
}

impl Session {
    /// A fresh session with empty data, active as of `now`.
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            data: SessionData::new(),
            last_active: now,
        }
    }

    /// Replaces the payload and refreshes the activity timestamp.
    ///
    /// `last_active` never moves backwards, even if `now` is older than the
    /// recorded instant.
    pub(crate) fn replace_data(&mut self, data: SessionData, now: Instant) {
        self.data = data;
        self.last_active = self.last_active.max(now);
    }

    /// Whether more than `timeout` has passed between `last_active` and `now`.
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_active) > timeout
    }

    /// The caller's payload.
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// When this session was created or last updated.
    pub fn last_active(&self) -> Instant {
        self.last_active
    }
}
