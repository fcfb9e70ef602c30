//! Streaming turn pipeline: resolve the session, run the engine, persist the
//! outcome.
//!
//! Fragments are forwarded to the caller as soon as they are produced; the
//! store is touched only after the turn reaches a terminal state, so a
//! persistence failure can never block or corrupt the exchange already
//! delivered to the user.

use crate::engine::{ConversationEngine, GenerateError, StepEvent};
use crate::error::ChatError;
use crate::identity;
use crate::store::SessionStore;
use crate::types::{Message, SessionId, Transcript};
use futures_util::StreamExt;
use lagoon_protocol::{ChatRequest, StreamEvent};
use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// Buffered events between the turn task and the transport.
const EVENT_BUFFER: usize = 64;

/// Final accounting for a completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSummary {
    /// Session id that produced the response.
    pub session_id: SessionId,
    /// Assistant content that was streamed (possibly truncated if the
    /// client disconnected mid-stream).
    pub response: String,
}

/// Reply handle for one turn: the resolved session credential plus the live
/// event stream.
pub struct ChatReply {
    /// Session id bound to this turn; echo it to the client out of band.
    pub session_id: SessionId,
    /// Whether the session id was minted for this request.
    pub minted: bool,
    /// Live stream of turn events, fragments first, one terminal event last.
    pub events: ReceiverStream<StreamEvent>,
    handle: JoinHandle<Result<TurnSummary, ChatError>>,
}

impl ChatReply {
    /// The opaque credential the client must present on its next call.
    pub fn token(&self) -> String {
        identity::token(self.session_id)
    }

    /// Await completion of the turn, including persistence.
    pub async fn finish(self) -> Result<TurnSummary, ChatError> {
        self.handle
            .await
            .map_err(|err| ChatError::TurnTask(err.to_string()))?
    }
}

/// Drives the engine for one turn and finalizes the transcript update.
#[derive(Clone)]
pub struct StreamingResponder {
    engine: ConversationEngine,
    store: SessionStore,
}

impl StreamingResponder {
    /// Create a responder over an engine and a session store.
    pub fn new(engine: ConversationEngine, store: SessionStore) -> Self {
        Self { engine, store }
    }

    /// Start one turn. Validation failures are reported immediately; the
    /// returned reply then streams fragments while a background task owns
    /// the terminal persistence step, so the turn outlives a dropped reply.
    pub fn respond(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        let user_messages = validate_request(&request)?;
        let resolved = identity::resolve(request.session_token.as_deref());
        let session_id = resolved.session_id;

        let history = self.store.load(session_id);
        info!(
            "starting turn (session_id={}, minted={}, history_len={}, new_messages={})",
            session_id,
            resolved.minted,
            history.len(),
            user_messages.len()
        );
        let mut context = history;
        context.extend(user_messages.iter().cloned());

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let handle = tokio::spawn(run_turn(
            self.engine.clone(),
            self.store.clone(),
            session_id,
            user_messages,
            context,
            events_tx,
        ));

        Ok(ChatReply {
            session_id,
            minted: resolved.minted,
            events: ReceiverStream::new(events_rx),
            handle,
        })
    }
}

/// Convert and validate the request message list before any store access.
fn validate_request(request: &ChatRequest) -> Result<Vec<Message>, ChatError> {
    if request.messages.is_empty() {
        return Err(ChatError::MalformedRequest(
            "message list is empty".to_string(),
        ));
    }
    request
        .messages
        .iter()
        .map(|message| {
            Message::from_request(message).ok_or_else(|| {
                ChatError::MalformedRequest(format!("unknown role: {}", message.role))
            })
        })
        .collect()
}

/// How the streaming phase of a turn ended.
enum TurnEnd {
    /// The engine produced a complete assistant message.
    Completed(Message),
    /// The engine failed after any already-forwarded fragments.
    Failed(GenerateError),
    /// The client stopped receiving mid-stream.
    Disconnected,
}

/// Execute one turn: forward fragments, then append the outcome.
///
/// Persistence policy per terminal state:
/// - completed: user message(s) and the generated assistant message land in
///   one atomic append;
/// - failed: only the user message(s) are appended, so the transcript
///   remembers what was asked without a garbled partial answer;
/// - disconnected: partial assistant content is flushed as a truncated
///   assistant message (dropped when nothing was produced yet).
async fn run_turn(
    engine: ConversationEngine,
    store: SessionStore,
    session_id: SessionId,
    user_messages: Vec<Message>,
    context: Transcript,
    events: mpsc::Sender<StreamEvent>,
) -> Result<TurnSummary, ChatError> {
    let mut step = engine.step(context);
    let mut streamed = String::new();

    let end = loop {
        match step.next().await {
            Some(StepEvent::Fragment(text)) => {
                streamed.push_str(&text);
                if events.send(StreamEvent::Fragment { text }).await.is_err() {
                    break TurnEnd::Disconnected;
                }
            }
            Some(StepEvent::Completed(message)) => break TurnEnd::Completed(message),
            Some(StepEvent::Failed(err)) => break TurnEnd::Failed(err),
            None => {
                break TurnEnd::Failed(GenerateError::Provider(
                    "engine stream ended without a terminal event".to_string(),
                ));
            }
        }
    };
    // Dropping the step stream discards any in-flight inference call.
    drop(step);

    match end {
        TurnEnd::Completed(assistant) => {
            let response = assistant.content.clone();
            let mut to_store = user_messages;
            to_store.push(assistant);
            match store.append(session_id, to_store).await {
                Ok(()) => {
                    let _ = events.send(StreamEvent::Done).await;
                    info!(
                        "completed turn (session_id={}, response_len={})",
                        session_id,
                        response.len()
                    );
                    Ok(TurnSummary {
                        session_id,
                        response,
                    })
                }
                Err(err) => {
                    // The answer was already delivered; only durability of
                    // future context degrades.
                    error!(
                        "transcript write failed after delivery (session_id={}, error={})",
                        session_id, err
                    );
                    let _ = events
                        .send(StreamEvent::Error {
                            message: format!("failed to persist transcript: {err}"),
                        })
                        .await;
                    Err(ChatError::Store(err))
                }
            }
        }
        TurnEnd::Failed(err) => {
            warn!(
                "turn failed (session_id={}, streamed_len={}, error={})",
                session_id,
                streamed.len(),
                err
            );
            if let Err(store_err) = store.append(session_id, user_messages).await {
                error!(
                    "could not record user messages for failed turn (session_id={}, error={})",
                    session_id, store_err
                );
            }
            let _ = events
                .send(StreamEvent::Error {
                    message: err.to_string(),
                })
                .await;
            Err(ChatError::Inference(err))
        }
        TurnEnd::Disconnected => {
            warn!(
                "client disconnected mid-stream (session_id={}, streamed_len={})",
                session_id,
                streamed.len()
            );
            let mut to_store = user_messages;
            if !streamed.is_empty() {
                to_store.push(Message::assistant(streamed.clone()));
            }
            store.append(session_id, to_store).await?;
            Ok(TurnSummary {
                session_id,
                response: streamed,
            })
        }
    }
}
