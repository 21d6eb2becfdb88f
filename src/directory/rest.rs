//! Supabase (PostgREST) directory client.
//!
//! Issues `GET {base}/rest/v1/{table}?select=*&nombre=eq.X&contraseña=eq.Y`
//! with the project's anon key. PostgREST returns a JSON array of matching
//! rows; the single-record contract is enforced locally so zero matches is
//! `Ok(None)` rather than a backend error.

use std::time::Duration;

use serde::Deserialize;

use super::{DirectoryError, UserDirectory, single_user};
use crate::user::{IDENTITY_FIELD, SECRET_FIELD, User};

/// Connection settings for a Supabase project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Public anon key, sent as both `apikey` and bearer token.
    pub api_key: String,
    pub table: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

pub struct RestDirectory {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

/// PostgREST / Supabase gateway error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

impl RestDirectory {
    /// Build a client for the given project.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::HttpClientBuild`] if the HTTP client cannot
    /// be constructed.
    pub fn new(config: RestConfig) -> Result<Self, DirectoryError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| DirectoryError::HttpClientBuild(e.to_string()))?;
        let endpoint = format!("{}/rest/v1/{}", config.base_url.trim_end_matches('/'), config.table);
        Ok(Self { http, endpoint, api_key: config.api_key })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl UserDirectory for RestDirectory {
    async fn find_user(&self, identifier: &str, secret: &str) -> Result<Option<User>, DirectoryError> {
        let id_filter = format!("eq.{identifier}");
        let secret_filter = format!("eq.{secret}");
        let response = self
            .http
            .get(&self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .query(&[("select", "*"), (IDENTITY_FIELD, id_filter.as_str()), (SECRET_FIELD, secret_filter.as_str())])
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(DirectoryError::Api { status, message: error_message(&text) });
        }
        parse_rows(&text)
    }
}

/// Parse a successful PostgREST body into at most one user.
pub(crate) fn parse_rows(body: &str) -> Result<Option<User>, DirectoryError> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(body).map_err(|e| DirectoryError::Parse(e.to_string()))?;
    single_user(rows)
}

/// Pull the human-readable message out of an error body, falling back to the
/// raw text.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| body.trim().to_owned())
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
