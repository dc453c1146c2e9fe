use ring::digest;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Authenticated user as reported by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A signed-in session. Tokens are wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// UNIX timestamp (seconds) after which the access token is invalid.
    #[zeroize(skip)]
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[zeroize(skip)]
    pub user: User,
}

impl Session {
    /// Short stable identifier for this login session.
    ///
    /// Hex of the first 8 bytes of SHA-256(access_token); two sign-ins never
    /// share it, while repeated notifications for one login always do.
    pub fn fingerprint(&self) -> String {
        let hash = digest::digest(&digest::SHA256, self.access_token.as_bytes());
        hash.as_ref()[..8]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Returns true if `expires_at` is set and lies before `now` (UNIX seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }
}

// Keep tokens out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Email/password pair handed to the auth backend.
#[derive(Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}
