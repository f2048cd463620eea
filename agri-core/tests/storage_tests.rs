use agri_core::{KeyValueStore, TOKEN_KEY};

#[tokio::test]
async fn token_survives_reload_and_clears_on_logout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");

    let store = KeyValueStore::load_from(&path).await;
    assert!(store.token().await.is_none());
    store.set(TOKEN_KEY, "abc123").await.unwrap();

    let reopened = KeyValueStore::load_from(&path).await;
    assert_eq!(reopened.token().await.as_deref(), Some("abc123"));

    reopened.clear().await.unwrap();
    let after_logout = KeyValueStore::load_from(&path).await;
    assert!(after_logout.token().await.is_none());
}

#[tokio::test]
async fn load_uses_tmp_fallback_on_corrupted_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    tokio::fs::write(&path, b"{ this is not json ").await.unwrap();
    tokio::fs::write(
        dir.path().join("credentials.json.tmp"),
        br#"{ "token": "from-tmp" }"#,
    )
    .await
    .unwrap();

    let store = KeyValueStore::load_from(&path).await;
    assert_eq!(store.token().await.as_deref(), Some("from-tmp"));
}

#[tokio::test]
async fn empty_token_counts_as_absent() {
    let store = KeyValueStore::in_memory();
    store.set(TOKEN_KEY, "").await.unwrap();
    assert!(store.token().await.is_none());
    assert_eq!(store.remove(TOKEN_KEY).await.unwrap().as_deref(), Some(""));
    assert!(store.remove(TOKEN_KEY).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    let store = KeyValueStore::load_from(&path).await;

    let writes: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.set(&format!("key-{i}"), format!("value-{i}")).await })
        })
        .collect();
    for write in writes {
        write.await.unwrap().unwrap();
    }

    let reopened = KeyValueStore::load_from(&path).await;
    for i in 0..16 {
        assert_eq!(reopened.get(&format!("key-{i}")).await, Some(format!("value-{i}")));
    }
}
