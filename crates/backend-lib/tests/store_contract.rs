// ==============================
// tests/store_contract.rs
// ==============================
//! Behavior every `UserStore` backend has to share.

use sessionvault_backend::error::StoreError;
use sessionvault_backend::storage::{SlotSwap, UserRecord, UserStore};
use sessionvault_backend::{FlatFileUserStore, MemoryUserStore};
use sessionvault_common::UserId;
use std::sync::Arc;
use tempfile::TempDir;

fn record(name: &str) -> UserRecord {
    UserRecord::new(name, &format!("{name}@example.com"), name, "hash".to_string())
}

async fn lookups(store: &dyn UserStore) {
    let alice = record("alice");
    store.insert(alice.clone()).await.unwrap();

    assert_eq!(store.find_by_id(&alice.id).await.unwrap(), Some(alice.clone()));
    assert_eq!(store.find_by_identifier("Alice").await.unwrap(), Some(alice.clone()));
    assert_eq!(
        store.find_by_identifier("alice@EXAMPLE.com").await.unwrap(),
        Some(alice)
    );
    assert_eq!(store.find_by_identifier("bob").await.unwrap(), None);
    assert_eq!(store.find_by_id(&UserId::new()).await.unwrap(), None);
}

async fn uniqueness(store: &dyn UserStore) {
    store.insert(record("alice")).await.unwrap();

    for duplicate in [
        UserRecord::new("ALICE", "new@example.com", "A", "h".into()),
        UserRecord::new("new", "Alice@Example.com", "A", "h".into()),
    ] {
        assert!(matches!(
            store.insert(duplicate).await,
            Err(StoreError::Conflict(_))
        ));
    }
    store.insert(record("bob")).await.unwrap();
}

async fn slot_updates(store: &dyn UserStore) {
    let alice = record("alice");
    store.insert(alice.clone()).await.unwrap();

    let updated = store
        .set_renewal_token(&alice.id, Some("t1".into()))
        .await
        .unwrap();
    assert_eq!(updated.renewal_token.as_deref(), Some("t1"));
    assert!(updated.updated_at >= alice.updated_at);

    assert_eq!(
        store.swap_renewal_token(&alice.id, "wrong", "t2".into()).await.unwrap(),
        SlotSwap::Mismatch
    );
    assert_eq!(
        store.swap_renewal_token(&alice.id, "t1", "t2".into()).await.unwrap(),
        SlotSwap::Swapped
    );
    assert_eq!(
        store.swap_renewal_token(&alice.id, "t1", "t3".into()).await.unwrap(),
        SlotSwap::Mismatch
    );

    let cleared = store.set_renewal_token(&alice.id, None).await.unwrap();
    assert!(cleared.renewal_token.is_none());
    assert_eq!(
        store.swap_renewal_token(&alice.id, "t2", "t3".into()).await.unwrap(),
        SlotSwap::Mismatch
    );

    let rehashed = store.set_password_hash(&alice.id, "new-hash".into()).await.unwrap();
    assert_eq!(rehashed.password_hash, "new-hash");
    assert_eq!(rehashed.created_at, alice.created_at);
}

async fn missing_user(store: &dyn UserStore) {
    let id = UserId::new();
    assert!(matches!(
        store.set_password_hash(&id, "h".into()).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.set_renewal_token(&id, None).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.swap_renewal_token(&id, "a", "b".into()).await,
        Err(StoreError::NotFound(_))
    ));
}

async fn racing_swaps(store: Arc<dyn UserStore>) {
    let alice = record("alice");
    store.insert(alice.clone()).await.unwrap();
    store.set_renewal_token(&alice.id, Some("live".into())).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            let id = alice.id;
            tokio::spawn(async move {
                store.swap_renewal_token(&id, "live", format!("next-{i}")).await
            })
        })
        .collect();

    let mut swapped = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() == SlotSwap::Swapped {
            swapped += 1;
        }
    }
    assert_eq!(swapped, 1);
}

async fn run_contract<F>(make: F)
where
    F: Fn() -> (Arc<dyn UserStore>, Option<TempDir>),
{
    let (store, _dir) = make();
    lookups(store.as_ref()).await;
    let (store, _dir) = make();
    uniqueness(store.as_ref()).await;
    let (store, _dir) = make();
    slot_updates(store.as_ref()).await;
    let (store, _dir) = make();
    missing_user(store.as_ref()).await;
    let (store, _dir) = make();
    racing_swaps(store).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_store_contract() {
    run_contract(|| (Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>, None)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_flat_file_store_contract() {
    run_contract(|| {
        let dir = TempDir::new().unwrap();
        let store = FlatFileUserStore::new(dir.path()).unwrap();
        (Arc::new(store) as Arc<dyn UserStore>, Some(dir))
    })
    .await;
}
