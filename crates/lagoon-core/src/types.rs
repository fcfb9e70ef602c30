//! Core data types for session transcripts.

use lagoon_protocol::RequestMessage;
use serde::{Deserialize, Serialize};

/// Unique identifier for a session.
pub type SessionId = lagoon_protocol::SessionId;

/// Speaker role for a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User-authored message.
    User,
    /// Assistant-authored message.
    Assistant,
}

impl Role {
    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a role from a lowercase string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Message stored in a session transcript.
///
/// Immutable once created; ordering within a transcript is chronological and
/// forms the prompt context. The serialized shape is exactly
/// `{role, content}` so store files stay compatible across implementations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Role that produced the message.
    pub role: Role,
    /// Message content.
    pub content: String,
}

impl Message {
    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Convert a wire message, rejecting unknown roles.
    pub fn from_request(message: &RequestMessage) -> Option<Self> {
        Some(Self {
            role: Role::parse(&message.role)?,
            content: message.content.clone(),
        })
    }
}

/// Ordered history of messages for one conversation.
pub type Transcript = Vec<Message>;

#[cfg(test)]
mod tests {
    use super::{Message, Role};
    use lagoon_protocol::RequestMessage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn role_parses_and_formats() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), None);
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }

    #[test]
    fn message_serializes_to_the_store_shape() {
        let encoded = serde_json::to_value(Message::user("Hello")).expect("serialize");
        assert_eq!(encoded, json!({ "role": "user", "content": "Hello" }));

        let decoded: Message =
            serde_json::from_value(json!({ "role": "assistant", "content": "Hi" }))
                .expect("deserialize");
        assert_eq!(decoded, Message::assistant("Hi"));
    }

    #[test]
    fn request_conversion_rejects_unknown_roles() {
        let valid = RequestMessage::user("Hello");
        assert_eq!(Message::from_request(&valid), Some(Message::user("Hello")));

        let invalid = RequestMessage {
            role: "tool".to_string(),
            content: "out of scope".to_string(),
        };
        assert_eq!(Message::from_request(&invalid), None);
    }
}
