//! Session-aware streaming chat core.
//!
//! This crate owns session identity, the durable transcript store, the
//! single-step conversation engine, and the streaming responder that ties
//! them together for one turn at a time.

pub mod engine;
pub mod error;
pub mod identity;
pub mod prompt;
pub mod responder;
pub mod store;
pub mod types;

pub use engine::{ConversationEngine, FragmentStream, GenerateError, StepEvent, TextGenerator};
pub use error::ChatError;
pub use responder::{ChatReply, StreamingResponder, TurnSummary};
pub use store::{SessionStore, StoreError};
pub use types::{Message, Role, SessionId, Transcript};
