//! Fixed in-memory user list, loadable from a JSON fixture file.
//!
//! Intended for local development without a backend and as the test double
//! behind the session store. Matching follows the backend query exactly:
//! string equality on both the identity and secret columns.

use std::path::Path;

use serde_json::Value;

use super::{DirectoryError, UserDirectory, single_user};
use crate::user::{IDENTITY_FIELD, SECRET_FIELD, User};

#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    rows: Vec<Value>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new(rows: Vec<Value>) -> Self {
        Self { rows }
    }

    /// Load rows from a JSON array file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON array.
    pub fn from_json_file(path: &Path) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path)?;
        let rows: Vec<Value> = serde_json::from_str(&raw).map_err(|e| DirectoryError::Parse(e.to_string()))?;
        Ok(Self::new(rows))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait::async_trait]
impl UserDirectory for StaticDirectory {
    async fn find_user(&self, identifier: &str, secret: &str) -> Result<Option<User>, DirectoryError> {
        let matches = self
            .rows
            .iter()
            .filter(|row| {
                row.get(IDENTITY_FIELD).and_then(Value::as_str) == Some(identifier)
                    && row.get(SECRET_FIELD).and_then(Value::as_str) == Some(secret)
            })
            .cloned()
            .collect();
        single_user(matches)
    }
}

#[cfg(test)]
#[path = "static_dir_test.rs"]
mod tests;
