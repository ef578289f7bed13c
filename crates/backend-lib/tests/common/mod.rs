//! Shared setup for the integration tests.
//!
//! Hashing runs with very low cost parameters so a full login/renew flow
//! stays fast. Keep the returned `TempDir` in scope for flat-file tests,
//! dropping it deletes the store directory.
#![allow(dead_code)]

use async_trait::async_trait;
use sessionvault_backend::auth::{HashAlgorithm, HasherSettings};
use sessionvault_backend::config::Settings;
use sessionvault_backend::error::StoreError;
use sessionvault_backend::storage::{SlotSwap, UserRecord, UserStore};
use sessionvault_backend::{FlatFileUserStore, MemoryUserStore, SessionManager};
use sessionvault_common::{NewUser, UserId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const ACCESS_SECRET: &str = "integration-access-secret-0123456789";
pub const PASSWORD: &str = "Wonderland#2024";
pub const NEW_PASSWORD: &str = "Looking-Glass#2025";

/// Settings with a valid secret and cheap hashing
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.signing.access_secret = ACCESS_SECRET.to_string();
    settings.hasher = HasherSettings {
        algorithm: HashAlgorithm::Scrypt,
        scrypt_log_n: 8,
        scrypt_r: 8,
        scrypt_p: 1,
        argon2_m_cost: 256,
        argon2_t_cost: 1,
        argon2_p_cost: 1,
    };
    settings
}

/// Manager over a fresh in-memory store
pub fn memory_manager(settings: &Settings) -> (SessionManager, MemoryUserStore) {
    let store = MemoryUserStore::new();
    let manager = SessionManager::from_settings(settings, Arc::new(store.clone())).unwrap();
    (manager, store)
}

/// Manager over a flat-file store in a temporary directory
pub fn flat_file_manager(settings: &Settings) -> (SessionManager, FlatFileUserStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = FlatFileUserStore::new(temp_dir.path()).unwrap();
    let manager = SessionManager::from_settings(settings, Arc::new(store.clone())).unwrap();
    (manager, store, temp_dir)
}

pub fn new_user(name: &str) -> NewUser {
    NewUser {
        username: name.to_string(),
        email: format!("{name}@example.com"),
        full_name: format!("{name} Example"),
        password: PASSWORD.to_string(),
    }
}

/// Store wrapper that counts every call made through it
#[derive(Clone, Default)]
pub struct CountingStore {
    inner: MemoryUserStore,
    calls: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserStore for CountingStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.hit();
        self.inner.find_by_identifier(identifier).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        self.hit();
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, record: UserRecord) -> Result<(), StoreError> {
        self.hit();
        self.inner.insert(record).await
    }

    async fn set_password_hash(
        &self,
        id: &UserId,
        password_hash: String,
    ) -> Result<UserRecord, StoreError> {
        self.hit();
        self.inner.set_password_hash(id, password_hash).await
    }

    async fn set_renewal_token(
        &self,
        id: &UserId,
        token: Option<String>,
    ) -> Result<UserRecord, StoreError> {
        self.hit();
        self.inner.set_renewal_token(id, token).await
    }

    async fn swap_renewal_token(
        &self,
        id: &UserId,
        expected: &str,
        replacement: String,
    ) -> Result<SlotSwap, StoreError> {
        self.hit();
        self.inner.swap_renewal_token(id, expected, replacement).await
    }
}
