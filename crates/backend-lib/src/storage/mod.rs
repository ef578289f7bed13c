// ============================
// sessionvault-backend/src/storage/mod.rs
// ============================
//! User-record storage abstraction.
//!
//! The session core only ever reads a record, decides, and writes back one
//! field. Rotation goes through [`UserStore::swap_renewal_token`] so that two
//! renewals racing on the same token cannot both win.
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sessionvault_common::{PublicUser, UserId};
use std::fmt;

pub mod flat_file;
pub mod memory;

pub use flat_file::FlatFileUserStore;
pub use memory::MemoryUserStore;

/// Persisted identity record
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    /// Lower-cased login name
    pub username: String,
    /// Lower-cased email address
    pub email: String,
    pub full_name: String,
    /// PHC string of the current password
    pub password_hash: String,
    /// The single live renewal credential, if the user is logged in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Create a fresh record with an empty renewal slot
    pub fn new(username: &str, email: &str, full_name: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username: normalize_identifier(username),
            email: normalize_identifier(email),
            full_name: full_name.trim().to_string(),
            password_hash,
            renewal_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sanitized view, without the hash or the renewal token
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            created_at: self.created_at,
        }
    }

    /// Does a normalized identifier name this user (by username or email)?
    pub fn matches_identifier(&self, normalized: &str) -> bool {
        self.username == normalized || self.email == normalized
    }

    /// Shares a username or email with `other`
    pub fn collides_with(&self, other: &UserRecord) -> bool {
        self.username == other.username || self.email == other.email
    }
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("password_hash", &"<redacted>")
            .field("renewal_token", &self.renewal_token.as_ref().map(|_| "<redacted>"))
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Usernames and emails are matched case-insensitively
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

/// Outcome of a conditional renewal-slot update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSwap {
    /// The slot held the expected value and now holds the replacement
    Swapped,
    /// The slot held something else (or nothing); it was left untouched
    Mismatch,
}

/// Trait for user-record backends
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look a user up by username or email
    async fn find_by_identifier(&self, identifier: &str)
        -> Result<Option<UserRecord>, StoreError>;

    /// Look a user up by id
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a new record; fails with `Conflict` on a duplicate username or email
    async fn insert(&self, record: UserRecord) -> Result<(), StoreError>;

    /// Replace the password hash
    async fn set_password_hash(
        &self,
        id: &UserId,
        password_hash: String,
    ) -> Result<UserRecord, StoreError>;

    /// Overwrite the renewal slot unconditionally (`None` clears it)
    async fn set_renewal_token(
        &self,
        id: &UserId,
        token: Option<String>,
    ) -> Result<UserRecord, StoreError>;

    /// Replace the renewal slot only if it currently holds `expected`
    async fn swap_renewal_token(
        &self,
        id: &UserId,
        expected: &str,
        replacement: String,
    ) -> Result<SlotSwap, StoreError>;
}
