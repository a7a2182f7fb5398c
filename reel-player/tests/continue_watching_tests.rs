//! Continue-watching persistence

use reel_player::db::continue_watching::SAVED_IDS_KEY;
use reel_player::db::settings::get_setting;
use reel_player::db::{init_database, init_memory_database, ContinueWatchingStore};

#[tokio::test]
async fn test_append_is_idempotent_and_ordered() {
    let db = init_memory_database().await.unwrap();
    let mut store = ContinueWatchingStore::load(db.clone()).await.unwrap();
    assert!(store.is_empty());

    assert!(store.append(7).await.unwrap());
    assert!(store.append(3).await.unwrap());
    assert!(!store.append(7).await.unwrap());
    assert_eq!(store.ids(), &[7, 3]);
    assert!(store.contains(3));

    let raw: Option<String> = get_setting(&db, SAVED_IDS_KEY).await.unwrap();
    assert_eq!(raw.as_deref(), Some("[7,3]"));
}

#[tokio::test]
async fn test_remove() {
    let db = init_memory_database().await.unwrap();
    let mut store = ContinueWatchingStore::load(db.clone()).await.unwrap();
    store.append(1).await.unwrap();
    store.append(2).await.unwrap();

    assert!(store.remove(1).await.unwrap());
    assert!(!store.remove(1).await.unwrap());

    let reloaded = ContinueWatchingStore::load(db).await.unwrap();
    assert_eq!(reloaded.ids(), &[2]);
}

#[tokio::test]
async fn test_survives_reopen_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reel.db");

    {
        let db = init_database(&path).await.unwrap();
        let mut store = ContinueWatchingStore::load(db.clone()).await.unwrap();
        store.append(42).await.unwrap();
        store.append(43).await.unwrap();
        db.close().await;
    }

    let db = init_database(&path).await.unwrap();
    let store = ContinueWatchingStore::load(db).await.unwrap();
    assert_eq!(store.ids(), &[42, 43]);
    assert_eq!(store.len(), 2);
}
