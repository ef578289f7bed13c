// ============================
// sessionvault-backend/src/storage/flat_file.rs
// ============================
//! Flat-file implementation of the `UserStore` trait.
//!
//! One pretty-printed JSON document per user under `<root>/users/`. Every
//! read-modify-write of a record happens under that user's async mutex, and
//! files are replaced by rename so a reader never sees a half-written record.
//! The locks are per process: two processes sharing one directory are not
//! serialized against each other. A user's lock lives in the map only while
//! some call is holding or waiting on it.
use super::{normalize_identifier, SlotSwap, UserRecord, UserStore};
use crate::auth::token_generator::constant_time_eq;
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sessionvault_common::UserId;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::{fs as tokio_fs, sync::Mutex};

#[derive(Clone)]
pub struct FlatFileUserStore {
    root: PathBuf,
    locks: Arc<DashMap<UserId, Arc<Mutex<()>>>>,
    registration: Arc<Mutex<()>>,
}

impl FlatFileUserStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("users"))?;
        Ok(Self {
            root,
            locks: Arc::new(DashMap::new()),
            registration: Arc::new(Mutex::new(())),
        })
    }

    fn users_dir(&self) -> PathBuf {
        self.root.join("users")
    }

    fn user_path(&self, id: &UserId) -> PathBuf {
        self.users_dir().join(format!("{id}.json"))
    }

    fn lock_for(&self, id: &UserId) -> Arc<Mutex<()>> {
        self.locks.entry(*id).or_default().value().clone()
    }

    /// Run `work` under the user's lock, then drop the lock from the map if
    /// no other call picked it up meanwhile
    async fn locked<T, Fut>(&self, id: &UserId, work: Fut) -> Result<T, StoreError>
    where
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().await;
            work.await
        };
        drop(lock);

        // Count is checked under the shard write lock; 1 means only the map holds it
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn read_record(path: &Path) -> Result<Option<UserRecord>, StoreError> {
        match tokio_fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_record(&self, record: &UserRecord) -> Result<(), StoreError> {
        let path = self.user_path(&record.id);
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(record)?;
        tokio_fs::write(&tmp, json).await?;
        tokio_fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Every stored record, in directory order
    async fn all_records(&self) -> Result<Vec<UserRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = tokio_fs::read_dir(self.users_dir()).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = Self::read_record(&path).await? {
                records.push(record);
            }
        }

        Ok(records)
    }

    async fn update<F>(&self, id: &UserId, apply: F) -> Result<UserRecord, StoreError>
    where
        F: FnOnce(&mut UserRecord) + Send,
    {
        self.locked(id, async move {
            let mut record = Self::read_record(&self.user_path(id))
                .await?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            apply(&mut record);
            record.updated_at = Utc::now();
            self.write_record(&record).await?;
            Ok(record)
        })
        .await
    }
}

#[async_trait]
impl UserStore for FlatFileUserStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let normalized = normalize_identifier(identifier);
        Ok(self
            .all_records()
            .await?
            .into_iter()
            .find(|record| record.matches_identifier(&normalized)))
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        Self::read_record(&self.user_path(id)).await
    }

    async fn insert(&self, record: UserRecord) -> Result<(), StoreError> {
        let _guard = self.registration.lock().await;

        let taken = self
            .all_records()
            .await?
            .iter()
            .any(|existing| existing.id == record.id || existing.collides_with(&record));
        if taken {
            return Err(StoreError::Conflict(record.username));
        }

        self.write_record(&record).await
    }

    async fn set_password_hash(
        &self,
        id: &UserId,
        password_hash: String,
    ) -> Result<UserRecord, StoreError> {
        self.update(id, |record| record.password_hash = password_hash)
            .await
    }

    async fn set_renewal_token(
        &self,
        id: &UserId,
        token: Option<String>,
    ) -> Result<UserRecord, StoreError> {
        self.update(id, |record| record.renewal_token = token).await
    }

    async fn swap_renewal_token(
        &self,
        id: &UserId,
        expected: &str,
        replacement: String,
    ) -> Result<SlotSwap, StoreError> {
        self.locked(id, async move {
            let mut record = Self::read_record(&self.user_path(id))
                .await?
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            let current_matches = record
                .renewal_token
                .as_deref()
                .is_some_and(|current| constant_time_eq(current, expected));
            if !current_matches {
                return Ok(SlotSwap::Mismatch);
            }

            record.renewal_token = Some(replacement);
            record.updated_at = Utc::now();
            self.write_record(&record).await?;
            Ok(SlotSwap::Swapped)
        })
        .await
    }
}
