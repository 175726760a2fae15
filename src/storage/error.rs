/// Errors surfaced by [`MessageStore`](super::MessageStore).
///
/// `Unavailable` means the store could not be opened at all; `Read` and
/// `Write` are failures of a single operation. Nothing is retried
/// internally.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("local storage unavailable at {location}: {source}")]
    Unavailable {
        location: String,
        #[source]
        source: StorageFault,
    },
    #[error("failed to write messages: {0}")]
    Write(#[source] StorageFault),
    #[error("failed to read messages: {0}")]
    Read(#[source] StorageFault),
}

/// Underlying cause of a [`StoreError`].
#[derive(Debug, thiserror::Error)]
pub enum StorageFault {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: i64, supported: i64 },
    #[error("storage worker failed: {0}")]
    Worker(String),
}
