//! The session store: every live session behind one exclusive guard.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Creating sessions with IDs from the configured [`IdGenerator`]
//! - Handing out copies of session data
//! - Replacing session data and refreshing activity timestamps
//! - Deleting sessions, explicitly or by expiry sweep
//!
//! # Concurrency note
//!
//! All access to the map goes through a single `tokio::sync::Mutex`.
//! Every operation does its lookup and its mutation inside one critical
//! section, so a check-then-act sequence can never interleave with the
//! reaper's sweep or another caller. No method calls another guarded method
//! while holding the lock.
//!
//! A sharded map would cut contention under heavy write load; with small
//! entries and O(1) operations the single lock is the simpler choice.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{IdGenerator, RandomIdGenerator, Session, SessionData, SessionError, SessionId};

/// Owns all live sessions.
///
/// Share it between tasks with an `Arc`; every method takes `&self`.
///
/// ## Lifecycle
///
/// ```text
/// create_session() ──→ update_session_data() ──→ delete_session()
///        │                      │
///        └──────────┬───────────┘
///                   ▼ (idle longer than timeout)
///            evict_expired()
/// ```
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
    ids: Box<dyn IdGenerator>,
}

impl SessionStore {
    /// Creates an empty store that mints random hex IDs.
    pub fn new() -> Self {
        Self::with_id_generator(RandomIdGenerator)
    }

    /// Creates an empty store that mints IDs with `ids`.
    pub fn with_id_generator(ids: impl IdGenerator) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ids: Box::new(ids),
        }
    }

    /// Creates a new session with empty data and returns its ID.
    ///
    /// The ID is generated before the lock is taken, so a slow generator
    /// never holds up other callers.
    ///
    /// # Errors
    /// [`SessionError::IdGeneration`] if the generator fails, or if it
    /// hands back an ID that is already live.
    pub async fn create_session(&self) -> Result<SessionId, SessionError> {
        let session_id = self.ids.generate_id()?;

        let mut sessions = self.sessions.lock().await;
        match sessions.entry(session_id) {
            Entry::Occupied(entry) => Err(SessionError::IdGeneration(format!(
                "generated id {} collides with a live session",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                let session_id = entry.key().clone();
                entry.insert(Session::new(Instant::now()));
                tracing::info!(%session_id, "session created");
                Ok(session_id)
            }
        }
    }

    /// Returns a copy of the session's data.
    ///
    /// Reading does not count as activity: `last_active` is left alone.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no live session has this ID.
    pub async fn get_session_data(&self, session_id: &SessionId) -> Result<SessionData, SessionError> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(session_id)
            .map(|session| session.data().clone())
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))
    }

    /// Replaces the session's data and marks it active as of now.
    ///
    /// Lookup, data swap and timestamp refresh happen under one lock, so
    /// the reaper sees either the old record or the new one.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no live session has this ID.
    pub async fn update_session_data(
        &self,
        session_id: &SessionId,
        data: SessionData,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

        session.replace_data(data, Instant::now());
        tracing::trace!(%session_id, "session data updated");
        Ok(())
    }

    /// Removes a session. Returns `true` if it was present.
    ///
    /// Deleting an unknown ID is not an error.
    pub async fn delete_session(&self, session_id: &SessionId) -> bool {
        let removed = self.sessions.lock().await.remove(session_id).is_some();
        if removed {
            tracing::info!(%session_id, "session deleted");
        }
        removed
    }

    /// Removes every session idle for longer than `timeout` and returns
    /// their IDs.
    ///
    /// The whole scan runs under the same lock as the foreground
    /// operations. This is what the reaper calls once per poll interval.
    pub async fn evict_expired(&self, timeout: Duration) -> Vec<SessionId> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        let mut evicted = Vec::new();

        sessions.retain(|session_id, session| {
            if session.is_expired(now, timeout) {
                evicted.push(session_id.clone());
                false
            } else {
                true
            }
        });

        evicted
    }

    /// When the session was created or last updated, if it is live.
    pub async fn last_active(&self, session_id: &SessionId) -> Option<Instant> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map(Session::last_active)
    }

    /// Returns `true` if a live session has this ID.
    pub async fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }

    /// Returns the number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Returns `true` if there are no live sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
