//! Durable local store of chat messages.
//!
//! Every process that opens the same file sees the same flat set of
//! messages. Writes are per-id upserts; reads come back ascending by
//! timestamp. Nothing here logs or retries: failures go back to the caller.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Params, Row, Transaction, TransactionBehavior, params};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;

use super::database::{DEFAULT_BUSY_TIMEOUT, StoreLocation, open_connection};
use super::error::{StorageFault, StoreError};
use crate::common::ChatMessage;

/// Bumped whenever the table layout changes.
pub const SCHEMA_VERSION: i64 = 2;

const SELECT_COLUMNS: &str =
    "SELECT id, content, sender, nickname, ts_secs, ts_nanos FROM chat_messages";
const ORDER: &str = "ORDER BY ts_secs ASC, ts_nanos ASC, id ASC";

/// Async handle to a message database. Cheap to clone; clones share the
/// same lazily opened connection.
#[derive(Clone)]
pub struct MessageStore {
    inner: Arc<Inner>,
}

struct Inner {
    location: StoreLocation,
    busy_timeout: Duration,
    conn: OnceCell<Arc<Mutex<Connection>>>,
}

impl MessageStore {
    /// Handle for `location`. Nothing is opened until the first operation.
    pub fn new(location: StoreLocation) -> Self {
        Self::with_busy_timeout(location, DEFAULT_BUSY_TIMEOUT)
    }

    /// Like [`MessageStore::new`], waiting at most `busy_timeout` for locks
    /// held by other connections before an operation fails.
    pub fn with_busy_timeout(location: StoreLocation, busy_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                location,
                busy_timeout,
                conn: OnceCell::new(),
            }),
        }
    }

    /// Private in-memory store.
    pub fn in_memory() -> Self {
        Self::new(StoreLocation::Memory)
    }

    pub fn location(&self) -> &StoreLocation {
        &self.inner.location
    }

    /// Open the database now instead of on first use.
    ///
    /// Idempotent. A failure is not remembered, so calling again retries.
    pub async fn connect(&self) -> Result<(), StoreError> {
        self.connection().await.map(|_| ())
    }

    /// Insert `message`, or overwrite the stored record with the same id.
    pub async fn save(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let message = message.clone();
        self.run(StoreError::Write, move |conn| {
            let (secs, nanos) = encode_timestamp(message.timestamp);
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT OR REPLACE INTO chat_messages (id, content, sender, nickname, ts_secs, ts_nanos)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.id,
                    message.content,
                    message.sender,
                    message.nickname,
                    secs,
                    nanos
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Every stored message, ascending by timestamp.
    pub async fn get_all(&self) -> Result<Vec<ChatMessage>, StoreError> {
        self.run(StoreError::Read, |conn| {
            let tx = conn.transaction()?;
            let messages = select_messages(&tx, &format!("{SELECT_COLUMNS} {ORDER}"), [])?;
            tx.commit()?;
            Ok(messages)
        })
        .await
    }

    /// Messages with a timestamp strictly after `since`, ascending.
    pub async fn get_newer(&self, since: DateTime<Utc>) -> Result<Vec<ChatMessage>, StoreError> {
        let (secs, nanos) = encode_timestamp(since);
        self.run(StoreError::Read, move |conn| {
            let tx = conn.transaction()?;
            let messages = select_messages(
                &tx,
                &format!("{SELECT_COLUMNS} WHERE (ts_secs, ts_nanos) > (?1, ?2) {ORDER}"),
                params![secs, nanos],
            )?;
            tx.commit()?;
            Ok(messages)
        })
        .await
    }

    /// Delete every message. Not recoverable.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.run(StoreError::Write, |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute("DELETE FROM chat_messages", [])?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Number of stored messages.
    pub async fn count(&self) -> Result<usize, StoreError> {
        self.run(StoreError::Read, |conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM chat_messages", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn connection(&self) -> Result<Arc<Mutex<Connection>>, StoreError> {
        let location = self.inner.location.clone();
        let busy_timeout = self.inner.busy_timeout;
        self.inner
            .conn
            .get_or_try_init(|| async move {
                let opened = {
                    let location = location.clone();
                    tokio::task::spawn_blocking(move || open_store(&location, busy_timeout)).await
                };
                opened
                    .map_err(|err| StorageFault::Worker(err.to_string()))
                    .and_then(|result| result)
                    .map(|conn| Arc::new(Mutex::new(conn)))
                    .map_err(|source| StoreError::Unavailable {
                        location: location.to_string(),
                        source,
                    })
            })
            .await
            .cloned()
    }

    /// Run `work` against the connection on the blocking pool. The lock is
    /// held for exactly one unit of work.
    async fn run<T, F>(&self, wrap: fn(StorageFault) -> StoreError, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageFault> + Send + 'static,
    {
        let conn = self.connection().await?;
        let joined = tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().unwrap_or_else(PoisonError::into_inner);
            work(&mut guard)
        })
        .await;

        joined
            .map_err(|err| StorageFault::Worker(err.to_string()))
            .and_then(|result| result)
            .map_err(wrap)
    }
}

/// Open the connection and bring the schema up to [`SCHEMA_VERSION`].
fn open_store(location: &StoreLocation, busy_timeout: Duration) -> Result<Connection, StorageFault> {
    let mut conn = open_connection(location, busy_timeout)?;
    init_schema(&mut conn)?;
    Ok(conn)
}

fn init_schema(conn: &mut Connection) -> Result<(), StorageFault> {
    // Take the write lock up front; another process may be migrating too.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let found: i64 = tx.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if found > SCHEMA_VERSION {
        return Err(StorageFault::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    if found == 1 {
        // Version 1 kept one i64 nanosecond column, which cannot hold
        // instants outside 1677..2262.
        tx.execute_batch(
            "ALTER TABLE chat_messages RENAME TO chat_messages_v1;
             DROP INDEX IF EXISTS idx_chat_messages_timestamp;",
        )?;
    }

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS chat_messages (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            sender TEXT NOT NULL,
            nickname TEXT NOT NULL,
            ts_secs INTEGER NOT NULL,
            ts_nanos INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chat_messages_ts
            ON chat_messages(ts_secs, ts_nanos);",
    )?;

    if found == 1 {
        tx.execute_batch(
            "INSERT INTO chat_messages (id, content, sender, nickname, ts_secs, ts_nanos)
             SELECT id, content, sender, nickname,
                    (timestamp - ((timestamp % 1000000000) + 1000000000) % 1000000000) / 1000000000,
                    ((timestamp % 1000000000) + 1000000000) % 1000000000
             FROM chat_messages_v1;
             DROP TABLE chat_messages_v1;",
        )?;
    }

    if found < SCHEMA_VERSION {
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    tx.commit()?;
    Ok(())
}

fn select_messages<P: Params>(
    tx: &Transaction<'_>,
    sql: &str,
    params: P,
) -> Result<Vec<ChatMessage>, StorageFault> {
    let mut stmt = tx.prepare(sql)?;
    let messages = stmt
        .query_map(params, message_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(messages)
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let secs: i64 = row.get(4)?;
    let nanos: i64 = row.get(5)?;
    let timestamp = u32::try_from(nanos)
        .ok()
        .and_then(|nanos| DateTime::from_timestamp(secs, nanos))
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(5, nanos))?;

    Ok(ChatMessage {
        id: row.get(0)?,
        content: row.get(1)?,
        sender: row.get(2)?,
        nickname: row.get(3)?,
        timestamp,
    })
}

/// Whole seconds since the Unix epoch plus the sub-second part. Exact for
/// every `DateTime<Utc>`, and the pair sorts chronologically.
fn encode_timestamp(timestamp: DateTime<Utc>) -> (i64, i64) {
    (
        timestamp.timestamp(),
        i64::from(timestamp.timestamp_subsec_nanos()),
    )
}
