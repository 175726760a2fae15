use rusqlite::Connection;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use super::error::StorageFault;

/// How long an operation waits on a lock held by another connection.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a message database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// SQLite file shared by every process that opens the same path.
    File(PathBuf),
    /// Private in-memory database, gone when the last handle drops.
    Memory,
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocation::File(path) => write!(f, "{}", path.display()),
            StoreLocation::Memory => f.write_str(":memory:"),
        }
    }
}

/// Open a raw connection for `location`, creating parent directories.
pub fn open_connection(
    location: &StoreLocation,
    busy_timeout: Duration,
) -> Result<Connection, StorageFault> {
    match location {
        StoreLocation::File(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let conn = Connection::open(path)?;
            conn.busy_timeout(busy_timeout)?;
            // WAL lets readers in other processes proceed during a write.
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            Ok(conn)
        }
        StoreLocation::Memory => Ok(Connection::open_in_memory()?),
    }
}
