// ============================
// sessionvault-backend/src/storage/memory.rs
// ============================
//! In-memory user store.
//!
//! Conditional slot updates run under the DashMap shard lock of the user's
//! key, which makes them atomic per user.
use super::{normalize_identifier, SlotSwap, UserRecord, UserStore};
use crate::auth::token_generator::constant_time_eq;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use sessionvault_common::UserId;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<DashMap<UserId, UserRecord>>,
    /// Serializes inserts so the uniqueness check and the insert are one step
    registration: Arc<Mutex<()>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn update<F>(&self, id: &UserId, apply: F) -> Result<UserRecord, StoreError>
    where
        F: FnOnce(&mut UserRecord),
    {
        let mut entry = self
            .users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        apply(entry.value_mut());
        entry.updated_at = Utc::now();
        Ok(entry.value().clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let normalized = normalize_identifier(identifier);
        Ok(self
            .users
            .iter()
            .find(|entry| entry.matches_identifier(&normalized))
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, record: UserRecord) -> Result<(), StoreError> {
        let _guard = self.registration.lock();

        let taken = self
            .users
            .iter()
            .any(|entry| entry.id == record.id || entry.collides_with(&record));
        if taken {
            return Err(StoreError::Conflict(record.username));
        }

        self.users.insert(record.id, record);
        Ok(())
    }

    async fn set_password_hash(
        &self,
        id: &UserId,
        password_hash: String,
    ) -> Result<UserRecord, StoreError> {
        self.update(id, |record| record.password_hash = password_hash)
    }

    async fn set_renewal_token(
        &self,
        id: &UserId,
        token: Option<String>,
    ) -> Result<UserRecord, StoreError> {
        self.update(id, |record| record.renewal_token = token)
    }

    async fn swap_renewal_token(
        &self,
        id: &UserId,
        expected: &str,
        replacement: String,
    ) -> Result<SlotSwap, StoreError> {
        let mut entry = self
            .users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let current_matches = entry
            .renewal_token
            .as_deref()
            .is_some_and(|current| constant_time_eq(current, expected));
        if !current_matches {
            return Ok(SlotSwap::Mismatch);
        }

        entry.renewal_token = Some(replacement);
        entry.updated_at = Utc::now();
        Ok(SlotSwap::Swapped)
    }
}
