use chrono::Local;

use shared_chat_store::{ChatMessage, Identity};

pub fn render_message(message: &ChatMessage, me: &Identity) -> String {
    let time = message.timestamp.with_timezone(&Local).format("%H:%M");
    if message.is_from(me) {
        format!("[{time}] {} (you): {}", message.nickname, message.content)
    } else {
        format!("[{time}] {}: {}", message.nickname, message.content)
    }
}

/// Shown once the room's history has loaded.
pub fn welcome(room: &str, me: &Identity) -> String {
    format!("-- welcome to #{room}, {}. Be kind to each other. --", me.nickname)
}

pub fn render(messages: &[ChatMessage], me: &Identity) -> Vec<String> {
    messages
        .iter()
        .map(|message| render_message(message, me))
        .collect()
}
