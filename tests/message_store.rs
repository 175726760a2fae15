use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures::future::join_all;
use shared_chat_store::storage::room_location;
use shared_chat_store::{ChatMessage, Identity, MessageStore, StorageFault, StoreError, StoreLocation};

fn message(id: &str, secs: i64) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        content: format!("content {id}"),
        sender: "user".to_string(),
        nickname: "alice".to_string(),
        timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
    }
}

#[tokio::test]
async fn messages_survive_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let location = room_location(dir.path(), "lobby");

    let original = ChatMessage::compose(&Identity::new("alice"), "persist me");
    {
        let store = MessageStore::new(location.clone());
        store.save(&original).await.unwrap();
    }

    let reopened = MessageStore::new(location);
    assert_eq!(reopened.get_all().await.unwrap(), vec![original]);
}

#[tokio::test]
async fn independent_handles_on_one_file_see_each_other() {
    let dir = tempfile::tempdir().unwrap();
    let location = StoreLocation::File(dir.path().join("shared.db"));
    let tab_a = MessageStore::new(location.clone());
    let tab_b = MessageStore::new(location);

    let t0 = Utc.timestamp_opt(1_000, 0).unwrap();
    tab_a.save(&message("1", 1_000)).await.unwrap();
    assert!(tab_b.get_newer(t0).await.unwrap().is_empty());

    tab_b.save(&message("2", 1_001)).await.unwrap();
    let newer = tab_a.get_newer(t0).await.unwrap();
    assert_eq!(newer.len(), 1);
    assert_eq!(newer[0].id, "2");

    tab_a.clear().await.unwrap();
    assert!(tab_b.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn rooms_do_not_share_messages() {
    let dir = tempfile::tempdir().unwrap();
    let lobby = MessageStore::new(room_location(dir.path(), "lobby"));
    let movies = MessageStore::new(room_location(dir.path(), "movies"));

    lobby.save(&message("1", 1)).await.unwrap();

    assert_eq!(lobby.count().await.unwrap(), 1);
    assert_eq!(movies.count().await.unwrap(), 0);
}

#[tokio::test]
async fn many_concurrent_writers_all_persist_in_timestamp_order() {
    let dir = tempfile::tempdir().unwrap();
    let location = StoreLocation::File(dir.path().join("busy.db"));
    let handles: Vec<MessageStore> = (0..4).map(|_| MessageStore::new(location.clone())).collect();
    for handle in &handles {
        handle.connect().await.unwrap();
    }

    // Later timestamps are written first.
    let writes = (0..40i64).rev().map(|i| {
        let store = handles[i as usize % handles.len()].clone();
        async move { store.save(&message(&format!("m{i:02}"), 100 + i)).await }
    });
    for result in join_all(writes).await {
        result.unwrap();
    }

    let all = handles[0].get_all().await.unwrap();
    assert_eq!(all.len(), 40);
    let timestamps: Vec<DateTime<Utc>> = all.iter().map(|m| m.timestamp).collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn polling_with_a_cursor_sees_each_message_once() {
    let dir = tempfile::tempdir().unwrap();
    let location = StoreLocation::File(dir.path().join("poll.db"));
    let writer = MessageStore::new(location.clone());
    let reader = MessageStore::new(location);

    let mut cursor = Utc.timestamp_opt(0, 0).unwrap();
    let mut seen = Vec::new();
    for round in 0..3 {
        writer.save(&message(&format!("r{round}"), 10 + round)).await.unwrap();
        let batch = reader.get_newer(cursor).await.unwrap();
        if let Some(last) = batch.last() {
            cursor = last.timestamp;
        }
        seen.extend(batch.into_iter().map(|m| m.id));
    }

    assert_eq!(seen, vec!["r0", "r1", "r2"]);
    assert!(reader.get_newer(cursor).await.unwrap().is_empty());
    assert_eq!(cursor, Utc.timestamp_opt(12, 0).unwrap());
}

#[tokio::test]
async fn directory_in_place_of_database_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let store = MessageStore::new(StoreLocation::File(dir.path().to_path_buf()));

    let err = store.connect().await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable { .. }));

    // Operations report the same environment failure.
    let err = store.get_all().await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable { .. }));
}

#[tokio::test]
async fn failed_open_can_be_retried() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("rooms");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let store = MessageStore::new(room_location(dir.path(), "lobby"));
    let err = store.connect().await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Unavailable {
            source: StorageFault::Io(_),
            ..
        }
    ));

    std::fs::remove_file(&blocker).unwrap();
    store.connect().await.unwrap();
    store.save(&message("1", 1)).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn newer_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();
    }

    let store = MessageStore::new(StoreLocation::File(path));
    let err = store.connect().await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Unavailable {
            source: StorageFault::SchemaTooNew { found: 99, .. },
            ..
        }
    ));
}

#[tokio::test]
async fn operations_on_a_broken_schema_report_read_and_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.db");
    let store = MessageStore::new(StoreLocation::File(path.clone()));
    store.save(&message("1", 10)).await.unwrap();

    let other = rusqlite::Connection::open(&path).unwrap();
    other.execute_batch("DROP TABLE chat_messages").unwrap();

    assert!(matches!(store.get_all().await, Err(StoreError::Read(_))));
    assert!(matches!(
        store.get_newer(Utc.timestamp_opt(0, 0).unwrap()).await,
        Err(StoreError::Read(_))
    ));
    assert!(matches!(
        store.save(&message("2", 20)).await,
        Err(StoreError::Write(_))
    ));
    assert!(matches!(store.clear().await, Err(StoreError::Write(_))));
}

#[tokio::test]
async fn clear_fails_while_another_connection_holds_the_write_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.db");
    let store =
        MessageStore::with_busy_timeout(StoreLocation::File(path.clone()), Duration::from_millis(50));
    store.save(&message("1", 10)).await.unwrap();

    let holder = rusqlite::Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN EXCLUSIVE").unwrap();

    assert!(matches!(store.clear().await, Err(StoreError::Write(_))));
    // WAL readers are not blocked by the writer.
    assert_eq!(store.count().await.unwrap(), 1);

    holder.execute_batch("ROLLBACK").unwrap();
    assert_eq!(store.get_all().await.unwrap(), vec![message("1", 10)]);
    store.clear().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
}
