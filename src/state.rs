//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is built once at startup and handed to every consumer. It owns
//! the session store and the router; the router's guard holds another handle
//! to the same store, so there is exactly one session per application.

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

use std::sync::Arc;

use crate::config::{AppConfig, BackendConfig};
use crate::directory::rest::RestConfig;
use crate::directory::{DirectoryError, PgDirectory, RestDirectory, StaticDirectory, UserDirectory};
use crate::guard::NavigationGuard;
use crate::router::Router;
use crate::routes::{RouteTable, RouteTableError};
use crate::session::SessionStore;
use crate::storage::{DurableStorage, FileStorage};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("credential backend: {0}")]
    Directory(#[from] DirectoryError),
    #[error("route table: {0}")]
    Routes(#[from] RouteTableError),
}

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionStore>,
    pub router: Arc<Router>,
}

impl AppState {
    /// Wire a state from already-built collaborators.
    #[must_use]
    pub fn new(directory: Arc<dyn UserDirectory>, storage: Arc<dyn DurableStorage>, table: RouteTable) -> Self {
        let session = Arc::new(SessionStore::new(directory, storage));
        let guard = NavigationGuard::new(session.clone());
        let router = Arc::new(Router::new(table, guard));
        Self { session, router }
    }

    /// Build the backend, storage and route table described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a [`StartupError`] if the backend cannot be constructed or
    /// the configured route table cannot be loaded.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        let directory = build_directory(config).await?;
        let storage: Arc<dyn DurableStorage> = Arc::new(FileStorage::new(&config.storage_path));
        let table = match &config.routes_path {
            Some(path) => RouteTable::from_json_file(path)?,
            None => RouteTable::restaurant(),
        };
        tracing::debug!(
            backend = config.backend.kind(),
            storage = %config.storage_path.display(),
            routes = table.entries().len(),
            "application state ready"
        );
        Ok(Self::new(directory, storage, table))
    }
}

async fn build_directory(config: &AppConfig) -> Result<Arc<dyn UserDirectory>, DirectoryError> {
    let directory: Arc<dyn UserDirectory> = match &config.backend {
        BackendConfig::Supabase { url, anon_key } => Arc::new(RestDirectory::new(RestConfig {
            base_url: url.clone(),
            api_key: anon_key.clone(),
            table: config.users_table.clone(),
            request_timeout: config.timeouts.request(),
            connect_timeout: config.timeouts.connect(),
        })?),
        BackendConfig::Postgres { database_url, max_connections } => {
            Arc::new(PgDirectory::connect(database_url, &config.users_table, *max_connections).await?)
        }
        BackendConfig::File { users_path } => Arc::new(StaticDirectory::from_json_file(users_path)?),
    };
    Ok(directory)
}
