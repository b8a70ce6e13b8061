//! Conversation turns and the append-only log that holds them.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session-unique message identifier, increasing with insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in the conversation. Fields are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    role: Role,
    content: String,
    timestamp: DateTime<Local>,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

/// Ordered message history. Messages can be appended but never edited or removed.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a log seeded with one assistant greeting
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut log = Self::new();
        log.append(Role::Assistant, greeting);
        log
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) -> &Message {
        self.next_id += 1;

        // Wall clock can step backwards; keep timestamps in insertion order
        let now = Local::now();
        let timestamp = match self.messages.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };

        self.messages.push(Message {
            id: MessageId(self.next_id),
            role,
            content: content.into(),
            timestamp,
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_seeds_one_assistant_message() {
        let log = MessageLog::with_greeting("Hello!");
        assert_eq!(log.len(), 1);
        let first = &log.as_slice()[0];
        assert_eq!(first.role(), Role::Assistant);
        assert_eq!(first.content(), "Hello!");
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut log = MessageLog::new();
        let a = log.append(Role::User, "a").id();
        let b = log.append(Role::Assistant, "b").id();
        let c = log.append(Role::User, "c").id();
        assert!(a < b && b < c);
        assert_eq!(log.get(b).map(Message::content), Some("b"));
    }

    #[test]
    fn test_timestamps_follow_insertion_order() {
        let mut log = MessageLog::new();
        for i in 0..20 {
            log.append(Role::User, i.to_string());
        }
        let stamps: Vec<_> = log.iter().map(Message::timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_append_keeps_content_verbatim() {
        let mut log = MessageLog::new();
        log.append(Role::User, "  spaced  \n");
        assert_eq!(log.last().map(Message::content), Some("  spaced  \n"));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }
}
