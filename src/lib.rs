//! Local, durable chat-message store with a polling chat session on top.
//!
//! [`MessageStore`] persists [`ChatMessage`]s in a SQLite file that several
//! processes may share. [`ChatSession`] keeps an ordered, deduplicated
//! [`Timeline`] of one store in step by polling it.

pub mod common;
pub mod config;
pub mod session;
pub mod storage;

pub use common::{ChatMessage, Identity, SessionCommand, SessionEvent};
pub use config::AppConfig;
pub use session::{ChatSession, SessionHandle, SessionOptions, Timeline};
pub use storage::{MessageStore, StorageFault, StoreError, StoreLocation};
