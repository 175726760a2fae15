/// Commands a front end sends down to the chat session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    SendMessage(String),
    /// Wipe every message in the current room's store.
    Clear,
    /// Retry hydration after a failed initial load.
    Reconnect,
}
