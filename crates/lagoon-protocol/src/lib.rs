//! Wire types exchanged between the chat core and its transport.
//!
//! The surrounding framework owns request parsing and stream framing; this
//! crate only fixes the shapes that cross that boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a session.
pub type SessionId = Uuid;

/// Message as it appears in an incoming request.
///
/// Roles arrive as free-form strings and are validated by the core before a
/// turn starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestMessage {
    /// Role name (`user` or `assistant`).
    pub role: String,
    /// Message content.
    pub content: String,
}

impl RequestMessage {
    /// Build a user-role request message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A single chat turn submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// Opaque session credential echoed from a previous reply, if any.
    #[serde(default)]
    pub session_token: Option<String>,
    /// New messages for this turn, in order.
    pub messages: Vec<RequestMessage>,
}

/// Events emitted on the reply stream for one turn.
///
/// Fragments arrive strictly in production order. Every stream ends with
/// exactly one terminal event: `Done` on success, `Error` otherwise. An
/// `Error` never retracts fragments that were already delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum StreamEvent {
    /// Incremental generated text.
    Fragment { text: String },
    /// Terminal: the turn completed and was persisted.
    Done,
    /// Terminal: the turn failed after any already-delivered fragments.
    Error { message: String },
}
