//! Session ID generation hook.
//!
//! SessionWard doesn't decide what a session ID looks like. It asks an
//! [`IdGenerator`]: a single method that returns a fresh ID or an error.
//! The default [`RandomIdGenerator`] produces 128-bit random hex strings;
//! applications that need signed, prefixed or externally-issued IDs plug
//! in their own implementation.

use rand::Rng;

use crate::{SessionError, SessionId};

/// Produces new, unique session IDs.
///
/// # Contract
///
/// Every successful call must return an ID that no other call (on any
/// thread) has returned while that session could still be live. The store
/// relies on this for uniqueness and refuses to overwrite a live session
/// if the contract is broken.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// use sessionward_session::{IdGenerator, SessionError, SessionId};
///
/// /// Sequential IDs. Predictable, so only suitable for tests.
/// struct CounterIds(AtomicU64);
///
/// impl IdGenerator for CounterIds {
///     fn generate_id(&self) -> Result<SessionId, SessionError> {
///         let n = self.0.fetch_add(1, Ordering::Relaxed);
///         Ok(SessionId::new(format!("s-{n}")))
///     }
/// }
/// ```
pub trait IdGenerator: Send + Sync + 'static {
    /// Returns a fresh session ID.
    ///
    /// # Errors
    /// [`SessionError::IdGeneration`] when no ID could be produced.
    fn generate_id(&self) -> Result<SessionId, SessionError>;
}

impl<T: IdGenerator + ?Sized> IdGenerator for Box<T> {
    fn generate_id(&self) -> Result<SessionId, SessionError> {
        (**self).generate_id()
    }
}

/// Generates random 32-character hex IDs (128 bits of entropy).
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate_id(&self) -> Result<SessionId, SessionError> {
        let bytes: [u8; 16] = rand::rng().random();
        Ok(SessionId::new(
            bytes.iter().map(|b| format!("{b:02x}")).collect::<String>(),
        ))
    }
}
