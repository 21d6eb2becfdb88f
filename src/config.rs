//! Application configuration parsed from environment variables.
//!
//! Parsing goes through a key lookup so tests can supply a map instead of
//! mutating the process environment.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path::PathBuf;
use std::time::Duration;

use crate::directory::DEFAULT_USERS_TABLE;

pub const DEFAULT_STORAGE_PATH: &str = ".comanda/local-storage.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    #[error("invalid value for {var}: {value:?} ({expected})")]
    Invalid { var: &'static str, value: String, expected: &'static str },
}

/// Which credential lookup service to talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Supabase REST gateway (the hosted default).
    Supabase { url: String, anon_key: String },
    /// Direct PostgreSQL connection.
    Postgres { database_url: String, max_connections: u32 },
    /// JSON fixture of user rows, for local development.
    File { users_path: PathBuf },
}

impl BackendConfig {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Supabase { .. } => "supabase",
            Self::Postgres { .. } => "postgres",
            Self::File { .. } => "file",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Timeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub users_table: String,
    /// File backing durable local storage.
    pub storage_path: PathBuf,
    /// Optional JSON route table replacing the built-in one.
    pub routes_path: Option<PathBuf>,
    pub timeouts: Timeouts,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// - `COMANDA_BACKEND`: `supabase` (default), `postgres` or `file`
    /// - `SUPABASE_URL`, `SUPABASE_ANON_KEY`: required for `supabase`
    /// - `DATABASE_URL`: required for `postgres`; `DB_MAX_CONNECTIONS` default 5
    /// - `COMANDA_USERS_PATH`: required for `file`
    /// - `COMANDA_USERS_TABLE`: default `usuarios`
    /// - `COMANDA_STORAGE_PATH`: default `.comanda/local-storage.json`
    /// - `COMANDA_ROUTES_PATH`: optional
    /// - `COMANDA_REQUEST_TIMEOUT_SECS` (30), `COMANDA_CONNECT_TIMEOUT_SECS` (10)
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a required variable is missing or the
    /// backend kind is unknown.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup. Empty values count as
    /// unset.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing { var: key });

        let backend = match get("COMANDA_BACKEND").as_deref().unwrap_or("supabase") {
            "supabase" => BackendConfig::Supabase {
                url: require("SUPABASE_URL")?
                    .trim_end_matches('/')
                    .to_owned(),
                anon_key: require("SUPABASE_ANON_KEY")?,
            },
            "postgres" => BackendConfig::Postgres {
                database_url: require("DATABASE_URL")?,
                max_connections: parse_or(get("DB_MAX_CONNECTIONS"), DEFAULT_DB_MAX_CONNECTIONS),
            },
            "file" => BackendConfig::File { users_path: PathBuf::from(require("COMANDA_USERS_PATH")?) },
            other => {
                return Err(ConfigError::Invalid {
                    var: "COMANDA_BACKEND",
                    value: other.to_owned(),
                    expected: "supabase, postgres or file",
                });
            }
        };

        Ok(Self {
            backend,
            users_table: get("COMANDA_USERS_TABLE").unwrap_or_else(|| DEFAULT_USERS_TABLE.to_owned()),
            storage_path: get("COMANDA_STORAGE_PATH").map_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from),
            routes_path: get("COMANDA_ROUTES_PATH").map(PathBuf::from),
            timeouts: Timeouts {
                request_secs: parse_or(get("COMANDA_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_or(get("COMANDA_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}
