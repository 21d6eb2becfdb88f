//! Direct PostgreSQL directory for deployments that bypass the REST gateway.
//!
//! Rows come back as `to_jsonb(u)` so arbitrary extra columns flow into
//! [`User::fields`] without a fixed struct mapping.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use super::{DirectoryError, UserDirectory, single_user};
use crate::user::{IDENTITY_FIELD, SECRET_FIELD, User};

pub struct PgDirectory {
    pool: PgPool,
    query: String,
}

impl PgDirectory {
    /// Wrap an existing pool.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::InvalidTable`] if `table` is not a plain
    /// identifier.
    pub fn new(pool: PgPool, table: &str) -> Result<Self, DirectoryError> {
        Ok(Self { pool, query: lookup_query(table)? })
    }

    /// Connect a new pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table name is invalid or the connection fails.
    pub async fn connect(database_url: &str, table: &str, max_connections: u32) -> Result<Self, DirectoryError> {
        let query = lookup_query(table)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool, query })
    }
}

#[async_trait::async_trait]
impl UserDirectory for PgDirectory {
    async fn find_user(&self, identifier: &str, secret: &str) -> Result<Option<User>, DirectoryError> {
        let rows = sqlx::query(&self.query)
            .bind(identifier)
            .bind(secret)
            .fetch_all(&self.pool)
            .await?;
        let records = rows
            .iter()
            .map(|r| r.try_get::<serde_json::Value, _>("record"))
            .collect::<Result<Vec<_>, _>>()?;
        single_user(records)
    }
}

/// Quote a table name as a Postgres identifier, allowing one optional schema
/// qualifier (`schema.table`).
pub(crate) fn quote_table(table: &str) -> Result<String, DirectoryError> {
    let parts: Vec<&str> = table.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|p| {
            !p.is_empty() && p.chars().all(|c| c.is_alphanumeric() || c == '_') && !p.starts_with(|c: char| c.is_ascii_digit())
        });
    if !valid {
        return Err(DirectoryError::InvalidTable(table.to_owned()));
    }
    Ok(parts
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join("."))
}

/// `LIMIT 2` is enough to tell one match from many.
pub(crate) fn lookup_query(table: &str) -> Result<String, DirectoryError> {
    Ok(format!(
        "SELECT to_jsonb(u) AS record FROM {} AS u WHERE u.\"{IDENTITY_FIELD}\" = $1 AND u.\"{SECRET_FIELD}\" = $2 LIMIT 2",
        quote_table(table)?
    ))
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
