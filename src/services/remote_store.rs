//! Remote password collection for passforge.
//!
//! Mirrors favorite history entries to a PostgREST table (the Supabase REST
//! API) so they follow the user across devices. Every request is scoped by the
//! caller's [`Session`] and bounded by the client timeout.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::types::auth::Session;
use crate::types::errors::RemoteError;
use crate::types::history::HistoryEntry;
use crate::types::settings::RemoteSettings;

/// Trait defining remote password collection operations.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Creates or updates the record for `entry` owned by the session user.
    async fn upsert(&self, session: &Session, entry: &HistoryEntry) -> Result<(), RemoteError>;

    /// Lists the session user's records, newest first.
    async fn list_by_user(&self, session: &Session) -> Result<Vec<HistoryEntry>, RemoteError>;

    /// Deletes the record with the given id.
    async fn delete_by_id(&self, session: &Session, id: &str) -> Result<(), RemoteError>;
}

/// Row layout of the `passwords` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordRow {
    pub id: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub is_favorite: bool,
    pub user_id: String,
}

impl PasswordRow {
    pub fn from_entry(entry: &HistoryEntry, user_id: &str) -> Self {
        Self {
            id: entry.id.clone(),
            password: entry.password.clone(),
            created_at: entry.created_at,
            is_favorite: entry.is_favorite,
            user_id: user_id.to_string(),
        }
    }

    pub fn into_entry(self) -> HistoryEntry {
        HistoryEntry {
            id: self.id,
            password: self.password,
            created_at: self.created_at,
            is_favorite: self.is_favorite,
        }
    }
}

/// PostgREST client for the password table.
pub struct RestRemoteStore {
    client: Client,
    base_url: String,
    anon_key: String,
    table: String,
}

impl RestRemoteStore {
    /// Builds a client from settings. Fails if the backend is not configured.
    pub fn new(settings: &RemoteSettings) -> Result<Self, RemoteError> {
        let (url, anon_key) = match (&settings.url, &settings.anon_key) {
            (Some(url), Some(key)) if settings.is_configured() => (url, key),
            _ => return Err(RemoteError::NotConfigured),
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.clone(),
            table: settings.table.clone(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authorized(&self, request: RequestBuilder, session: &Session) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
    }

    /// Turns a non-success status into `RemoteError::Unavailable` with the body text.
    async fn check(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Unavailable(format!(
            "HTTP {}: {}",
            status.as_u16(),
            body.chars().take(200).collect::<String>()
        )))
    }
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    async fn upsert(&self, session: &Session, entry: &HistoryEntry) -> Result<(), RemoteError> {
        let row = PasswordRow::from_entry(entry, &session.user.id);
        let request = self
            .client
            .post(self.table_url())
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row]);
        let response = self.authorized(request, session).send().await?;
        Self::check(response).await?;
        log::debug!("upserted password {} for user {}", entry.id, session.user.id);
        Ok(())
    }

    async fn list_by_user(&self, session: &Session) -> Result<Vec<HistoryEntry>, RemoteError> {
        let user_filter = format!("eq.{}", session.user.id);
        let request = self.client.get(self.table_url()).query(&[
            ("select", "*"),
            ("user_id", user_filter.as_str()),
            ("order", "created_at.desc"),
        ]);
        let response = self.authorized(request, session).send().await?;
        let rows: Vec<PasswordRow> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Unavailable(format!("invalid response body: {}", e)))?;
        Ok(rows.into_iter().map(PasswordRow::into_entry).collect())
    }

    async fn delete_by_id(&self, session: &Session, id: &str) -> Result<(), RemoteError> {
        let id_filter = format!("eq.{}", id);
        let request = self
            .client
            .delete(self.table_url())
            .query(&[("id", id_filter.as_str())]);
        let response = self.authorized(request, session).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
