// ================
// crates/common/src/lib.rs
// ================
//! Common types shared between the session-credential core and whatever
//! transport sits on top of it (the operator CLI, an HTTP layer, ...).
//! Nothing in here carries a password hash or a stored renewal token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, immutable user identifier
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registration request
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewUser {
    /// Unique login name (stored lower-cased)
    pub username: String,
    /// Unique email address (stored lower-cased)
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Plaintext password, hashed before it reaches the store
    pub password: String,
}

/// Sanitized view of a user record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

/// A freshly issued access + renewal credential pair
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenPair {
    /// Short-lived bearer token for individual requests
    pub access_token: String,
    /// Long-lived bearer token, only good for one rotation
    pub renewal_token: String,
    /// When the access token stops verifying
    pub access_expires_at: DateTime<Utc>,
    /// When the renewal token stops verifying
    pub renewal_expires_at: DateTime<Utc>,
}

/// Result of a successful login
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponse {
    /// The authenticated user
    pub user: PublicUser,
    /// Credentials issued for this login
    #[serde(flatten)]
    pub tokens: TokenPair,
}
