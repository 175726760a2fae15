use crate::common::types::ChatMessage;

/// Events the chat session sends up to the front end.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Full history loaded from the store.
    Hydrated(Vec<ChatMessage>),
    /// Messages not seen before, ascending by timestamp.
    MessagesAdded(Vec<ChatMessage>),
    Typing(bool),
    /// The message was not stored; `content` is handed back for a retry.
    SendFailed { content: String, reason: String },
    Cleared,
    ClearFailed(String),
    /// The store could not be read at startup; polling is paused.
    Disconnected(String),
}
