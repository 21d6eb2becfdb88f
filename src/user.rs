//! User record returned by the credential lookup and persisted as the session.
//!
//! The backend collection (`usuarios`) is opaque: beyond the identity and role
//! columns every other column is carried through verbatim in [`User::fields`].
//! The secret column is always stripped on the way in.

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column holding the login identifier.
pub const IDENTITY_FIELD: &str = "nombre";
/// Column holding the plaintext secret compared by the backend query.
pub const SECRET_FIELD: &str = "contraseña";
/// Column holding the role tag.
pub const ROLE_FIELD: &str = "rol";

/// Role tags known to the restaurant route table.
///
/// Roles are compared by exact string equality; these are conveniences, not
/// an exhaustive enum.
pub mod role {
    pub const ADMINISTRADOR: &str = "administrador";
    pub const MESERO: &str = "mesero";
    pub const CHEF: &str = "chef";
}

/// An authenticated user as stored in the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Login identifier (`nombre`).
    #[serde(rename = "nombre")]
    pub name: String,
    /// Role tag (`rol`), e.g. `"mesero"`.
    #[serde(rename = "rol")]
    pub role: String,
    /// Remaining backend columns (id, timestamps, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl User {
    #[must_use]
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self { name: name.into(), role: role.into(), fields: Map::new() }
    }

    /// Build a user from a raw backend row, dropping the secret column.
    ///
    /// # Errors
    ///
    /// Fails if the row is not an object or lacks string `nombre`/`rol` fields.
    pub fn from_record(record: Value) -> Result<Self, serde_json::Error> {
        let Value::Object(mut row) = record else {
            return Err(serde_json::Error::custom("user record is not a JSON object"));
        };
        row.remove(SECRET_FIELD);
        serde_json::from_value(Value::Object(row))
    }

    /// Look up an extra backend column by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
