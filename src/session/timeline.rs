use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::Duration;

use crate::common::ChatMessage;

/// The caller's view of a room: ordered by timestamp, one entry per id.
#[derive(Debug, Default)]
pub struct Timeline {
    messages: Vec<ChatMessage>,
    seen: HashSet<String>,
    cursor: Option<DateTime<Utc>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Latest timestamp merged so far.
    pub fn cursor(&self) -> Option<DateTime<Utc>> {
        self.cursor
    }

    /// Lower bound for the next incremental poll, `lookback` before the
    /// cursor. `None` until something has been merged.
    pub fn poll_bound(&self, lookback: Duration) -> Option<DateTime<Utc>> {
        let cursor = self.cursor?;
        let lookback = chrono::Duration::from_std(lookback).unwrap_or(chrono::Duration::MAX);
        Some(cursor.checked_sub_signed(lookback).unwrap_or(DateTime::<Utc>::MIN_UTC))
    }

    /// Merge a batch from the store and return the messages that were not
    /// in the view yet, ascending by timestamp.
    ///
    /// A known id replaces the record in place but is not reported again.
    pub fn merge(&mut self, batch: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let mut added = Vec::new();

        for message in batch {
            if self.cursor.is_none_or(|cursor| message.timestamp > cursor) {
                self.cursor = Some(message.timestamp);
            }

            if self.seen.insert(message.id.clone()) {
                added.push(message.clone());
                self.messages.push(message);
            } else if let Some(existing) = self.messages.iter_mut().find(|m| m.id == message.id) {
                *existing = message;
            }
        }

        self.messages.sort_by_key(|message| message.timestamp);
        added.sort_by_key(|message| message.timestamp);
        added
    }

    /// Forget everything, as after the store was cleared.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.seen.clear();
        self.cursor = None;
    }
}
