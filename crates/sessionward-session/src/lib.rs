//! Session records and the guarded session store for SessionWard.
//!
//! This crate owns every piece of session state:
//!
//! 1. **Identity**: opaque session IDs minted by an [`IdGenerator`]
//! 2. **Records**: a [`Session`] holds the caller's payload and the
//!    instant it was last active
//! 3. **Storage**: [`SessionStore`] keeps every live session behind one
//!    exclusive guard, and exposes the sweep primitive the reaper uses
//!
//! # How it fits in the stack
//!
//! ```text
//! SessionManager (above)  ← façade: owns the store and the reaper task
//!     ↕
//! Reaper  ← calls SessionStore::evict_expired once per poll interval
//!     ↕
//! Session Layer (this crate)  ← records, IDs, guarded map
//! ```

mod error;
mod id;
mod session;
mod store;

pub use error::SessionError;
pub use id::{IdGenerator, RandomIdGenerator};
pub use session::{Session, SessionData, SessionId};
pub use store::SessionStore;
