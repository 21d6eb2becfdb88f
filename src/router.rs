//! Router: drives one navigation end to end.
//!
//! A navigation resolves the requested path, follows route-level redirects
//! (these apply before any guard), asks the guard, and on a guard redirect
//! starts over at the new target. The chain stops at the first allowed route.
//!
//! A role without a landing route (e.g. a user whose role is `cocinero`) would
//! otherwise bounce between the catch-all and the login route forever, so
//! the number of hops is capped.

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;

use std::sync::{Mutex, MutexGuard};

use crate::guard::{Decision, NavigationGuard};
use crate::routes::{ResolvedRoute, RouteTable};

const MAX_REDIRECT_HOPS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("no route matches {0:?}")]
    NotFound(String),
    #[error("navigation to {path:?} redirected more than {hops} times")]
    RedirectLoop { path: String, hops: usize },
}

/// A completed navigation.
#[derive(Clone, Debug, PartialEq)]
pub struct Navigation {
    pub location: ResolvedRoute,
    /// Paths visited and redirected away from, in order.
    pub redirected_from: Vec<String>,
}

impl Navigation {
    #[must_use]
    pub fn was_redirected(&self) -> bool {
        !self.redirected_from.is_empty()
    }
}

pub struct Router {
    table: RouteTable,
    guard: NavigationGuard,
    current: Mutex<Option<ResolvedRoute>>,
}

impl Router {
    #[must_use]
    pub fn new(table: RouteTable, guard: NavigationGuard) -> Self {
        Self { table, guard, current: Mutex::new(None) }
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<ResolvedRoute>> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// The last location a navigation settled on.
    #[must_use]
    pub fn current(&self) -> Option<ResolvedRoute> {
        self.lock_current().clone()
    }

    /// Navigate to `path`, following redirects until a route is allowed.
    ///
    /// # Errors
    ///
    /// - [`NavigationError::NotFound`] if some path in the chain matches no
    ///   route.
    /// - [`NavigationError::RedirectLoop`] after too many redirects.
    pub fn navigate(&self, path: &str) -> Result<Navigation, NavigationError> {
        let from = self.current().map(|r| r.path);
        let mut target = path.to_owned();
        let mut redirected_from = Vec::new();

        for _ in 0..=MAX_REDIRECT_HOPS {
            let resolved = self
                .table
                .resolve(&target)
                .ok_or_else(|| NavigationError::NotFound(target.clone()))?;

            if let Some(to) = &resolved.redirect {
                tracing::debug!(from = %resolved.path, to = %to, "route redirect");
                redirected_from.push(resolved.path.clone());
                target.clone_from(to);
                continue;
            }

            match self.guard.evaluate(&resolved, from.as_deref()) {
                Decision::Allow => {
                    tracing::info!(path = %resolved.path, redirects = redirected_from.len(), "navigated");
                    *self.lock_current() = Some(resolved.clone());
                    return Ok(Navigation { location: resolved, redirected_from });
                }
                Decision::Redirect(to) => {
                    redirected_from.push(resolved.path);
                    target = to;
                }
            }
        }

        tracing::warn!(path, hops = MAX_REDIRECT_HOPS, "redirect loop");
        Err(NavigationError::RedirectLoop { path: path.to_owned(), hops: MAX_REDIRECT_HOPS })
    }
}
