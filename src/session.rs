//! Session store: the single authority for who is logged in.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `SessionStore` lives in [`crate::state::AppState`] for the lifetime of
//! the application. The navigation guard reads it (after `check_auth`) on
//! every transition; the login flow drives `login`/`logout`.
//!
//! DESIGN
//! ======
//! The in-memory [`Session`] sits behind a short-lived mutex that is never
//! held across an `.await`. The role is always derived from the user record,
//! so `is_authenticated` and `role` cannot disagree.
//!
//! TRADE-OFFS
//! ==========
//! Login attempts may overlap. Each attempt takes a generation number when it
//! starts and only the most recently started attempt may apply its outcome;
//! `logout` also bumps the generation so a late response cannot resurrect a
//! cleared session. Superseded attempts still report their own result to
//! their caller.
//!
//! The persisted record has no expiry or integrity check: whatever is in local
//! storage is trusted as the current user.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::directory::{DirectoryError, UserDirectory};
use crate::storage::{DurableStorage, StorageError};
use crate::user::User;

/// Storage key holding the serialized user record.
pub const SESSION_STORAGE_KEY: &str = "user";

/// User-facing message for a lookup that matched nothing.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Credenciales inválidas";

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The credential service failed; its message is passed through.
    #[error(transparent)]
    Backend(#[from] DirectoryError),

    /// No record matched. Does not reveal which half of the pair was wrong.
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials,

    /// The authenticated record could not be written to local storage.
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// Local storage holds a session record that does not deserialize.
    #[error("stored session is malformed: {0}")]
    CorruptSession(#[source] serde_json::Error),
}

// =============================================================================
// SESSION SNAPSHOT
// =============================================================================

/// Point-in-time view of the session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    /// True only while the current login attempt is in flight.
    pub loading: bool,
    /// Message from the most recent failed login attempt.
    pub last_error: Option<String>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.role.as_str())
    }
}

// =============================================================================
// STORE
// =============================================================================

struct Inner {
    session: Session,
    generation: u64,
}

pub struct SessionStore {
    directory: Arc<dyn UserDirectory>,
    storage: Arc<dyn DurableStorage>,
    inner: Mutex<Inner>,
}

impl SessionStore {
    /// Create an empty (logged out) store. Nothing is read from storage until
    /// [`SessionStore::check_auth`] is called.
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>, storage: Arc<dyn DurableStorage>) -> Self {
        Self { directory, storage, inner: Mutex::new(Inner { session: Session::default(), generation: 0 }) }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.lock().session.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().session.is_authenticated()
    }

    #[must_use]
    pub fn role(&self) -> Option<String> {
        self.lock().session.role().map(str::to_owned)
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.lock().session.user.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().session.loading
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.lock().session.last_error.clone()
    }

    /// Authenticate against the directory and return the user's role.
    ///
    /// Exactly one directory lookup is issued. On success the record is
    /// persisted under [`SESSION_STORAGE_KEY`] and becomes the session user.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Backend`] if the lookup itself fails.
    /// - [`AuthError::InvalidCredentials`] if nothing matches.
    /// - [`AuthError::Storage`] if the record cannot be persisted.
    ///
    /// Every failure is also recorded as [`Session::last_error`].
    ///
    /// If a later `login` or a `logout` starts before this attempt finishes,
    /// its outcome is returned but not applied: an `Ok` role then does not
    /// mean the session was set, so check [`Self::is_authenticated`] before
    /// navigating on it.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<String, AuthError> {
        let generation = self.begin_attempt();
        let outcome = match self.directory.find_user(identifier, secret).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(AuthError::InvalidCredentials),
            Err(e) => Err(AuthError::Backend(e)),
        };
        self.finish_attempt(generation, identifier, outcome)
    }

    fn begin_attempt(&self) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.session.loading = true;
        inner.session.last_error = None;
        inner.generation
    }

    fn finish_attempt(&self, generation: u64, identifier: &str, outcome: Result<User, AuthError>) -> Result<String, AuthError> {
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(user = identifier, generation, current = inner.generation, "discarding superseded login result");
            return outcome.map(|user| user.role);
        }
        inner.session.loading = false;

        let applied = outcome.and_then(|user| {
            let raw = serde_json::to_string(&user).map_err(|e| AuthError::Storage(StorageError::Format(e)))?;
            self.storage.set(SESSION_STORAGE_KEY, &raw)?;
            Ok(user)
        });

        match applied {
            Ok(user) => {
                let role = user.role.clone();
                tracing::info!(user = %user.name, role = %role, "login succeeded");
                inner.session.user = Some(user);
                Ok(role)
            }
            Err(e) => {
                tracing::warn!(user = identifier, error = %e, "login failed");
                inner.session.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Clear the session and its persisted record. No network call.
    ///
    /// Idempotent. Any login still in flight is superseded.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the persisted record cannot be removed;
    /// the in-memory session is cleared regardless.
    pub fn logout(&self) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.session.loading = false;
        if let Some(user) = inner.session.user.take() {
            tracing::info!(user = %user.name, "logged out");
        }
        self.storage.remove(SESSION_STORAGE_KEY)
    }

    /// Restore the session user from local storage.
    ///
    /// A stored record always overwrites the in-memory user; with nothing
    /// stored the in-memory session is left as is.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Storage`] if storage cannot be read.
    /// - [`AuthError::CorruptSession`] if the stored record does not
    ///   deserialize. The in-memory session is unchanged in both cases.
    pub fn check_auth(&self) -> Result<(), AuthError> {
        let mut inner = self.lock();
        let Some(raw) = self.storage.get(SESSION_STORAGE_KEY)? else {
            return Ok(());
        };
        let user: User = serde_json::from_str(&raw).map_err(AuthError::CorruptSession)?;
        inner.session.user = Some(user);
        Ok(())
    }
}
