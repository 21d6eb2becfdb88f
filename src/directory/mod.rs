//! Credential lookup against the restaurant's user collection.
//!
//! DESIGN
//! ======
//! The session store only needs one query: "the unique record whose identity
//! equals X and whose secret equals Y". [`UserDirectory`] is that contract;
//! backends differ only in transport (Supabase REST, direct Postgres, or a
//! static fixture).
//!
//! The secret is compared in plaintext by the backend. This matches the
//! existing `usuarios` schema and is not a password-storage design.

pub mod postgres;
pub mod rest;
pub mod static_dir;

pub use postgres::PgDirectory;
pub use rest::RestDirectory;
pub use static_dir::StaticDirectory;

use crate::user::User;

/// Default backend collection holding user rows.
pub const DEFAULT_USERS_TABLE: &str = "usuarios";

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The backend answered with a non-success status. `message` is the
    /// backend's own explanation, passed through unchanged.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// The response body was not the expected JSON shape.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// More than one record matched; a unique match is required.
    #[error("lookup matched {0} records, expected at most one")]
    Ambiguous(usize),

    /// A matching record lacked required user fields.
    #[error("malformed user record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("user fixture io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A configured table name cannot be used as an identifier.
    #[error("invalid table name: {0:?}")]
    InvalidTable(String),
}

// =============================================================================
// DIRECTORY TRAIT
// =============================================================================

/// Backend-neutral credential lookup. Enables mocking in tests.
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find the unique user whose identity and secret both match.
    ///
    /// Returns `Ok(None)` when nothing matches. Unknown user and wrong secret
    /// are deliberately not distinguished.
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] if the backend fails, answers with an
    /// error, or more than one record matches.
    async fn find_user(&self, identifier: &str, secret: &str) -> Result<Option<User>, DirectoryError>;
}

/// Reduce raw matching rows to the single-record contract.
pub(crate) fn single_user(mut rows: Vec<serde_json::Value>) -> Result<Option<User>, DirectoryError> {
    if rows.len() > 1 {
        return Err(DirectoryError::Ambiguous(rows.len()));
    }
    Ok(rows.pop().map(User::from_record).transpose()?)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
