//! # SessionWard
//!
//! In-memory session manager with a background expiry sweep.
//!
//! Request handlers create, read, update and delete sessions concurrently
//! while a reaper task evicts every session that has been idle for longer
//! than the configured timeout.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sessionward::prelude::*;
//!
//! # async fn demo() -> Result<(), SessionwardError> {
//! let manager = SessionManager::new();
//!
//! let id = manager.create_session().await?;
//! let mut data = SessionData::new();
//! data.insert("website".into(), "longhoang.de".into());
//! manager.update_session_data(&id, data).await?;
//!
//! manager.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod manager;
mod telemetry;

pub use error::SessionwardError;
pub use manager::{SessionManager, SessionManagerBuilder};
pub use telemetry::init_tracing;

pub use sessionward_reaper::{ReaperConfig, ReaperError, ReaperMetrics};
pub use sessionward_session::{
    IdGenerator, RandomIdGenerator, SessionData, SessionError, SessionId,
};

/// Everything needed to embed a session manager.
pub mod prelude {
    pub use crate::{
        IdGenerator, ReaperConfig, SessionData, SessionError, SessionId, SessionManager,
        SessionwardError, init_tracing,
    };
}
