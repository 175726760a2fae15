pub mod database;
pub mod error;
pub mod message_store;

pub use database::StoreLocation;
pub use error::{StorageFault, StoreError};
pub use message_store::MessageStore;

use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ROOM: &str = "lobby";

/// Ensure data directory exists
pub fn ensure_data_dir(data_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(data_dir)?;
    Ok(())
}

/// Rooms are separate database files; the messages themselves carry no room.
pub fn room_location(data_dir: &Path, room: &str) -> StoreLocation {
    StoreLocation::File(room_database_path(data_dir, room))
}

pub fn room_database_path(data_dir: &Path, room: &str) -> PathBuf {
    data_dir
        .join("rooms")
        .join(format!("{}.db", sanitize_room(room)))
}

/// Rooms that have a database under `data_dir`, sorted by name.
pub fn list_rooms(data_dir: &Path) -> std::io::Result<Vec<String>> {
    let entries = match fs::read_dir(data_dir.join("rooms")) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut rooms = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "db") {
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                rooms.push(stem.to_string());
            }
        }
    }
    rooms.sort();
    Ok(rooms)
}

/// Map a room name onto a safe file stem.
pub fn sanitize_room(room: &str) -> String {
    let cleaned: String = room
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        DEFAULT_ROOM.to_string()
    } else {
        cleaned
    }
}
