//! Simulated participants.
//!
//! Replies are written straight into the store, the same way another tab
//! would write them, and reach the session through normal polling.

use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::common::{ChatMessage, SessionEvent};
use crate::storage::MessageStore;

/// Sender label used for every simulated reply.
pub const SIMULATED_SENDER: &str = "simulated";

const REPLIES: &[&str] = &[
    "That's an interesting thought! Can you tell me more?",
    "I see your point, though I see it a bit differently.",
    "Thanks for sharing! That reminds me of something...",
    "Good topic, we could dig into it further.",
    "That matters, I've had a similar experience.",
    "Worth thinking about, let's keep going.",
    "I hadn't looked at it from that angle. Very helpful.",
    "You're right, I agree completely.",
    "It's a complicated question with a lot of sides to it.",
    "Could you give an example? I'd like to understand better.",
];

const NICKNAMES: &[&str] = &[
    "Thinker", "Idle Cloud", "Breeze", "Hills", "Stardust", "Drifter", "Bamboo", "Moonlight",
    "Clear Wind", "Raindrop",
];

const MIN_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_millis(4_000);

pub struct Responder {
    store: MessageStore,
    reply_chance: f64,
}

impl Responder {
    pub fn new(store: MessageStore, reply_chance: f64) -> Self {
        Self {
            store,
            reply_chance: if reply_chance.is_nan() {
                0.0
            } else {
                reply_chance.clamp(0.0, 1.0)
            },
        }
    }

    /// Maybe schedule one reply. Returns whether a reply was scheduled.
    pub fn on_message_sent(&self, events: &mpsc::Sender<SessionEvent>) -> bool {
        let Some((mut reply, delay)) = self.draw_reply() else {
            return false;
        };

        let store = self.store.clone();
        let events = events.clone();
        tokio::spawn(async move {
            let _ = events.send(SessionEvent::Typing(true)).await;
            tokio::time::sleep(delay).await;
            reply.timestamp = Utc::now();
            if let Err(err) = store.save(&reply).await {
                log::warn!("Simulated reply from {} was not stored: {err}", reply.nickname);
            }
            let _ = events.send(SessionEvent::Typing(false)).await;
        });
        true
    }

    fn draw_reply(&self) -> Option<(ChatMessage, Duration)> {
        let mut rng = rand::thread_rng();
        if !rng.gen_bool(self.reply_chance) {
            return None;
        }

        let delay = rng.gen_range(MIN_DELAY..=MAX_DELAY);
        let content = REPLIES.choose(&mut rng).copied().unwrap_or(REPLIES[0]);
        let nickname = NICKNAMES.choose(&mut rng).copied().unwrap_or(NICKNAMES[0]);

        let reply = ChatMessage {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            sender: SIMULATED_SENDER.to_string(),
            nickname: nickname.to_string(),
            // Restamped when written.
            timestamp: Utc::now(),
        };
        Some((reply, delay))
    }
}
