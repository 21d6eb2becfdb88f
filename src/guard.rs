//! Navigation guard: the per-transition access decision.
//!
//! SYSTEM CONTEXT
//! ==============
//! The router calls [`NavigationGuard::evaluate`] before every transition
//! completes. The guard refreshes the session from local storage, then walks
//! a fixed rule list; the first rule that fires decides.
//!
//! 1. route requires auth, no user        -> redirect to login
//! 2. route requires a role, role differs -> redirect to `/<role>`
//! 3. route is login, user present        -> redirect to `/<role>`
//! 4. otherwise                           -> allow
//!
//! Roles compare by exact string equality. The guard never fails; a broken
//! stored session is logged and the in-memory session is used as is.

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

use std::sync::Arc;

use crate::routes::{LOGIN_PATH, ResolvedRoute};
use crate::session::{Session, SessionStore};

/// Outcome of evaluating one transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(String),
}

impl Decision {
    #[must_use]
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Redirect(to) => Some(to),
        }
    }
}

/// Landing route for a role: `/<role>`.
#[must_use]
pub fn role_landing(role: &str) -> String {
    format!("/{role}")
}

/// Pure decision table over a session snapshot.
#[must_use]
pub fn decide(session: &Session, to: &ResolvedRoute, login_path: &str) -> Decision {
    if to.requires_auth() && !session.is_authenticated() {
        return Decision::Redirect(login_path.to_owned());
    }

    if let Some(required) = to.required_role() {
        match session.role() {
            Some(role) if role == required => {}
            Some(role) => return Decision::Redirect(role_landing(role)),
            // Role-gated but not auth-gated, and nobody is logged in.
            None => return Decision::Redirect(login_path.to_owned()),
        }
    }

    if to.path == login_path {
        if let Some(role) = session.role() {
            return Decision::Redirect(role_landing(role));
        }
    }

    Decision::Allow
}

pub struct NavigationGuard {
    session: Arc<SessionStore>,
    login_path: String,
}

impl NavigationGuard {
    #[must_use]
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self::with_login_path(session, LOGIN_PATH)
    }

    #[must_use]
    pub fn with_login_path(session: Arc<SessionStore>, login_path: impl Into<String>) -> Self {
        Self { session, login_path: login_path.into() }
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Refresh the session from storage and decide on the transition
    /// `from -> to`.
    pub fn evaluate(&self, to: &ResolvedRoute, from: Option<&str>) -> Decision {
        if let Err(e) = self.session.check_auth() {
            tracing::warn!(error = %e, "could not restore stored session");
        }
        let session = self.session.snapshot();
        let decision = decide(&session, to, &self.login_path);
        tracing::debug!(
            from = from.unwrap_or("-"),
            to = %to.path,
            role = session.role().unwrap_or("-"),
            ?decision,
            "navigation evaluated"
        );
        decision
    }
}
