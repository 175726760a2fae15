use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single chat message as persisted in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender: String,
    pub nickname: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// New message from `identity`, stamped now with a fresh UUID v4 id.
    pub fn compose(identity: &Identity, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender: identity.sender.clone(),
            nickname: identity.nickname.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_from(&self, identity: &Identity) -> bool {
        self.sender == identity.sender
    }
}

/// Who the local user is. Chosen once, then read back on every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub nickname: String,
    /// Stable per-installation label; not an authenticated identity.
    pub sender: String,
}

impl Identity {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            sender: Uuid::new_v4().to_string(),
        }
    }

    /// Identity with a generated `anon-xxxx` nickname.
    pub fn anonymous() -> Self {
        let mut suffix = [0u8; 2];
        rand::thread_rng().fill_bytes(&mut suffix);
        Self::new(format!("anon-{}", hex::encode(suffix)))
    }

    /// Same sender label, different display name.
    pub fn renamed(&self, nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            sender: self.sender.clone(),
        }
    }
}
