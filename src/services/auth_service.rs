//! Authentication for passforge.
//!
//! `AuthClient` talks to a GoTrue-compatible backend (the Supabase auth API).
//! `AuthService` wraps a client with a minimum-interval rate limiter, owns the
//! current session, persists it, and publishes every change through a
//! `tokio::sync::watch` channel.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::watch;

use crate::services::preferences::Preferences;
use crate::types::auth::{Credentials, Session, User};
use crate::types::errors::AuthError;
use crate::types::settings::RemoteSettings;

/// Trait defining the auth backend primitives.
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// Registers a user. Returns a session only when the backend confirms
    /// the account immediately.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// GoTrue REST client.
pub struct RestAuthClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl RestAuthClient {
    pub fn new(settings: &RemoteSettings) -> Result<Self, AuthError> {
        let (url, anon_key) = match (&settings.url, &settings.anon_key) {
            (Some(url), Some(key)) if settings.is_configured() => (url, key),
            _ => return Err(AuthError::NotConfigured),
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// Maps a failed response onto the auth error taxonomy.
    async fn failure(response: Response) -> AuthError {
        let status = response.status();
        let retry_after_ms = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| secs * 1000)
            .unwrap_or(0);
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| status.to_string());
        match status {
            StatusCode::TOO_MANY_REQUESTS => AuthError::RateLimited { retry_after_ms },
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                AuthError::InvalidCredentials(message)
            }
            _ => AuthError::Unavailable(format!("HTTP {}: {}", status.as_u16(), message)),
        }
    }
}

/// Pulls a human readable message out of a GoTrue error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|field| value.get(*field).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[async_trait]
impl AuthClient for RestAuthClient {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let response = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(credentials)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(format!("invalid token response: {}", e)))?;
        Ok(token.into_session())
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<Option<Session>, AuthError> {
        let response = self
            .client
            .post(self.endpoint("signup"))
            .header("apikey", &self.anon_key)
            .json(credentials)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(format!("invalid signup response: {}", e)))?;
        if body.get("access_token").is_none() {
            // Email confirmation pending.
            return Ok(None);
        }
        let token: TokenResponse = serde_json::from_value(body)
            .map_err(|e| AuthError::Unavailable(format!("invalid signup response: {}", e)))?;
        Ok(Some(token.into_session()))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        Ok(())
    }
}

/// Rejects auth calls issued less than `min_interval` after the last accepted one.
pub struct AuthRateLimiter {
    min_interval: Duration,
    last_attempt: Option<Instant>,
}

impl AuthRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_attempt: None,
        }
    }

    pub fn check(&mut self) -> Result<(), AuthError> {
        self.check_at(Instant::now())
    }

    /// Like [`check`](Self::check) with an explicit clock reading.
    pub fn check_at(&mut self, now: Instant) -> Result<(), AuthError> {
        if let Some(last) = self.last_attempt {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                return Err(AuthError::RateLimited {
                    retry_after_ms: (wait.as_millis() as u64).max(1),
                });
            }
        }
        self.last_attempt = Some(now);
        Ok(())
    }
}

/// Session owner and auth entry point.
pub struct AuthService {
    client: Arc<dyn AuthClient>,
    limiter: Mutex<AuthRateLimiter>,
    state: watch::Sender<Option<Session>>,
    preferences: Option<Preferences>,
}

impl AuthService {
    pub fn new(client: Arc<dyn AuthClient>, min_interval: Duration) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            client,
            limiter: Mutex::new(AuthRateLimiter::new(min_interval)),
            state,
            preferences: None,
        }
    }

    /// Persists sessions through `preferences` and restores a stored,
    /// unexpired one immediately.
    pub fn with_persistence(mut self, preferences: Preferences) -> Self {
        if let Some(session) = preferences.load_session() {
            if session.is_expired_at(Utc::now().timestamp()) {
                log::info!("discarding expired session for user {}", session.user.id);
                if let Err(e) = preferences.save_session(None) {
                    log::warn!("failed to remove expired session: {}", e);
                }
            } else {
                log::info!("restored session for user {}", session.user.id);
                self.state.send_replace(Some(session));
            }
        }
        self.preferences = Some(preferences);
        self
    }

    pub fn get_session(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Subscribes to session changes. Dropping the receiver unsubscribes.
    pub fn on_auth_state_change(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    fn throttle(&self) -> Result<(), AuthError> {
        self.limiter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .check()
    }

    fn publish(&self, session: Option<Session>) {
        if let Some(prefs) = &self.preferences {
            if let Err(e) = prefs.save_session(session.as_ref()) {
                log::warn!("failed to persist session: {}", e);
            }
        }
        match &session {
            Some(s) => log::info!("signed in as {}", s.user.id),
            None => log::info!("signed out"),
        }
        self.state.send_replace(session);
    }

    fn credentials(email: &str, password: &str) -> Result<Credentials, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials(
                "email and password are required".to_string(),
            ));
        }
        Ok(Credentials::new(email, password))
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let credentials = Self::credentials(email, password)?;
        self.throttle()?;
        let session = self.client.sign_in_with_password(&credentials).await?;
        self.publish(Some(session.clone()));
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError> {
        let credentials = Self::credentials(email, password)?;
        self.throttle()?;
        let session = self.client.sign_up(&credentials).await?;
        if let Some(s) = &session {
            self.publish(Some(s.clone()));
        }
        Ok(session)
    }

    /// Ends the session. The local session is always cleared; a backend
    /// failure is only logged.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let session = match self.get_session() {
            Some(s) => s,
            None => {
                log::debug!("sign_out without a session");
                return Ok(());
            }
        };
        self.throttle()?;
        if let Err(e) = self.client.sign_out(&session).await {
            log::warn!("backend sign-out failed: {}", e);
        }
        self.publish(None);
        Ok(())
    }
}
