//! `SessionManager` builder and façade.
//!
//! This is the entry point for embedding SessionWard. It ties together the
//! two layers: the guarded store and the reaper task sweeping it.

use std::sync::Arc;
use std::time::Duration;

use sessionward_reaper::{Reaper, ReaperConfig, ReaperError, ReaperHandle, ReaperMetrics};
use sessionward_session::{
    IdGenerator, RandomIdGenerator, SessionData, SessionError, SessionId, SessionStore,
};

/// Builder for configuring and starting a [`SessionManager`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use sessionward::SessionManager;
///
/// # async fn demo() {
/// let manager = SessionManager::builder()
///     .timeout(Duration::from_secs(30 * 60))
///     .poll_interval(Duration::from_secs(30))
///     .build();
/// # }
/// ```
pub struct SessionManagerBuilder {
    config: ReaperConfig,
    ids: Box<dyn IdGenerator>,
}

impl SessionManagerBuilder {
    /// Creates a builder with default settings (5 s timeout, 250 ms poll,
    /// random hex IDs).
    pub fn new() -> Self {
        Self {
            config: ReaperConfig::default(),
            ids: Box::new(RandomIdGenerator),
        }
    }

    /// Sets the whole reaper configuration at once.
    pub fn config(mut self, config: ReaperConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets how often the reaper scans the store.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.config.poll_interval = poll_interval;
        self
    }

    /// Sets the inactivity timeout after which sessions are evicted.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the source of session IDs.
    pub fn id_generator(mut self, ids: impl IdGenerator) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Creates the store and spawns its reaper.
    ///
    /// # Panics
    /// If called outside a Tokio runtime.
    pub fn build(self) -> SessionManager {
        let store = Arc::new(SessionStore::with_id_generator(self.ids));
        let reaper = Reaper::spawn(Arc::clone(&store), self.config);

        tracing::info!(
            timeout_ms = reaper.config().timeout.as_secs_f64() * 1000.0,
            poll_interval_ms = reaper.config().poll_interval.as_secs_f64() * 1000.0,
            "session manager started"
        );

        SessionManager { store, reaper }
    }
}

impl Default for SessionManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks sessions from creation, through updates, to deletion or expiry.
///
/// Owns the store and the reaper task. All methods take `&self`, so wrap the
/// manager in an `Arc` to share it between request handlers. The reaper
/// stops when [`shutdown`](Self::shutdown) is called or the manager is
/// dropped.
pub struct SessionManager {
    store: Arc<SessionStore>,
    reaper: ReaperHandle,
}

impl SessionManager {
    /// Creates a new builder.
    pub fn builder() -> SessionManagerBuilder {
        SessionManagerBuilder::new()
    }

    /// Starts a manager with default settings.
    ///
    /// # Panics
    /// If called outside a Tokio runtime.
    pub fn new() -> Self {
        SessionManagerBuilder::new().build()
    }

    /// Creates a new session and returns its ID.
    ///
    /// # Errors
    /// [`SessionError::IdGeneration`] if no ID could be produced.
    pub async fn create_session(&self) -> Result<SessionId, SessionError> {
        self.store.create_session().await
    }

    /// Returns a copy of the session's data.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the session doesn't exist or expired.
    pub async fn get_session_data(&self, session_id: &SessionId) -> Result<SessionData, SessionError> {
        self.store.get_session_data(session_id).await
    }

    /// Overwrites the session's data and renews its expiry.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the session doesn't exist or expired.
    pub async fn update_session_data(
        &self,
        session_id: &SessionId,
        data: SessionData,
    ) -> Result<(), SessionError> {
        self.store.update_session_data(session_id, data).await
    }

    /// Deletes a session. Deleting an unknown session succeeds.
    pub async fn delete_session(&self, session_id: &SessionId) -> Result<(), SessionError> {
        self.store.delete_session(session_id).await;
        Ok(())
    }

    /// Returns the number of live sessions.
    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    /// Returns `true` if there are no live sessions.
    pub async fn is_empty(&self) -> bool {
        self.store.is_empty().await
    }

    /// The validated reaper configuration in effect.
    pub fn config(&self) -> ReaperConfig {
        self.reaper.config()
    }

    /// Snapshot of the reaper's metrics.
    pub fn reaper_metrics(&self) -> ReaperMetrics {
        self.reaper.metrics()
    }

    /// Whether the reaper is still sweeping. A crashed reaper is logged at
    /// `error` the moment it dies; after that, sessions no longer expire.
    pub fn is_reaper_alive(&self) -> bool {
        self.reaper.is_alive()
    }

    /// Stops the reaper and returns its final metrics.
    ///
    /// Sessions still in the store are dropped with the manager.
    ///
    /// # Errors
    /// [`ReaperError`] if the reaper had crashed or was cancelled.
    pub async fn shutdown(self) -> Result<ReaperMetrics, ReaperError> {
        let metrics = self.reaper.stop().await?;
        tracing::info!(
            total_scans = metrics.total_scans,
            total_evicted = metrics.total_evicted,
            "session manager shut down"
        );
        Ok(metrics)
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
