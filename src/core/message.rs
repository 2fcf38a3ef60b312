use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a chat bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "assistant")]
    Ai,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }

    /// Label drawn above the bubble.
    pub fn label(self) -> &'static str {
        match self {
            Sender::User => "You",
            Sender::Ai => "AI",
        }
    }

    pub fn is_user(self) -> bool {
        self == Sender::User
    }

    pub fn is_ai(self) -> bool {
        self == Sender::Ai
    }
}

impl AsRef<str> for Sender {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Identity of a message within a session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    #[serde(alias = "text")]
    pub content: String,
    #[serde(alias = "role")]
    pub sender: Sender,
}

impl ChatMessage {
    pub fn new(id: MessageId, sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            sender,
        }
    }

    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self::new(id, Sender::User, content)
    }

    pub fn ai(id: MessageId, content: impl Into<String>) -> Self {
        Self::new(id, Sender::Ai, content)
    }

    pub fn is_user(&self) -> bool {
        self.sender.is_user()
    }

    pub fn is_ai(&self) -> bool {
        self.sender.is_ai()
    }
}

/// Hands out millisecond-timestamp ids that never repeat within a process,
/// even when several messages are created in the same millisecond.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    last: i64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the generator so it never reissues an id already in `existing`.
    pub fn observe<'a>(&mut self, existing: impl IntoIterator<Item = &'a MessageId>) {
        for id in existing {
            if let Ok(value) = id.as_str().parse::<i64>() {
                self.last = self.last.max(value);
            }
        }
    }

    pub fn next_id(&mut self) -> MessageId {
        self.next_at(chrono::Utc::now().timestamp_millis())
    }

    fn next_at(&mut self, now_millis: i64) -> MessageId {
        let value = now_millis.max(self.last + 1);
        self.last = value;
        MessageId(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_sender_tags() {
        let msg = ChatMessage::ai(MessageId::new("17"), "**Jupiter** in the 10th");
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"id": "17", "content": "**Jupiter** in the 10th", "sender": "ai"})
        );
    }

    #[test]
    fn accepts_legacy_role_and_text_fields() {
        let raw = r#"{"id":"5","role":"assistant","text":"hello","createdAt":123}"#;
        let msg: ChatMessage = serde_json::from_str(raw).expect("legacy parse");
        assert_eq!(msg.sender, Sender::Ai);
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn ignores_transient_animation_flag() {
        let raw = r#"{"id":"9","content":"hi","sender":"user","isNew":true}"#;
        let msg: ChatMessage = serde_json::from_str(raw).expect("parse");
        assert!(msg.is_user());
    }

    #[test]
    fn invalid_sender_is_rejected() {
        let raw = r#"{"id":"9","content":"hi","sender":"system"}"#;
        assert!(serde_json::from_str::<ChatMessage>(raw).is_err());
    }

    #[test]
    fn ids_increase_within_the_same_millisecond() {
        let mut ids = MessageIdGenerator::new();
        let first = ids.next_at(1_000);
        let second = ids.next_at(1_000);
        let third = ids.next_at(999);
        assert_eq!(first.as_str(), "1000");
        assert_eq!(second.as_str(), "1001");
        assert_eq!(third.as_str(), "1002");
    }

    #[test]
    fn observed_ids_are_never_reissued() {
        let mut ids = MessageIdGenerator::new();
        let restored = [MessageId::new("5000"), MessageId::new("not-a-number")];
        ids.observe(restored.iter());
        assert_eq!(ids.next_at(10).as_str(), "5001");
    }
}
