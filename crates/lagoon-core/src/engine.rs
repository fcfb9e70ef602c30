//! Single-step conversation engine over an injected text generator.
//!
//! The engine is a one-node state machine: it forwards the full transcript
//! to the external inference capability, re-emits its fragments, and folds
//! them into one assistant message. It persists nothing, which keeps it
//! independently testable against fake generators.

use crate::types::{Message, Transcript};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt, stream};
use log::debug;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Stream of incremental text fragments from a generator.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, GenerateError>> + Send>>;

/// External inference capability: full message history in, fragment stream
/// out. Supplied by a model provider outside this crate.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Start generating a reply to the given ordered message history.
    async fn generate(&self, messages: &[Message]) -> Result<FragmentStream, GenerateError>;
}

/// Errors surfaced by the inference capability or its supervision.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The provider reported a failure.
    #[error("provider error: {0}")]
    Provider(String),
    /// No fragment arrived within the configured window.
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Events emitted while a single turn advances to its terminal state.
#[derive(Debug)]
pub enum StepEvent {
    /// Incremental text produced by the generator.
    Fragment(String),
    /// Terminal: assistant message assembled from all fragments.
    Completed(Message),
    /// Terminal: generation failed after any fragments already emitted.
    Failed(GenerateError),
}

/// State carried across `step` polls: INITIAL -> RUNNING -> TERMINAL.
enum StepPhase {
    /// Inference has not been invoked yet.
    Initial(Transcript),
    /// Fragments are being drained and accumulated.
    Running {
        fragments: FragmentStream,
        buffer: String,
    },
    /// A terminal event has been emitted.
    Terminal,
}

/// Single-step engine wrapping the external inference capability.
#[derive(Clone)]
pub struct ConversationEngine {
    /// Injected inference capability.
    generator: Arc<dyn TextGenerator>,
    /// Per-fragment timeout; a stalled generator fails the turn.
    fragment_timeout: Duration,
}

impl ConversationEngine {
    /// Create an engine over the given generator.
    pub fn new(generator: Arc<dyn TextGenerator>, fragment_timeout: Duration) -> Self {
        Self {
            generator,
            fragment_timeout,
        }
    }

    /// Run one turn: emit every fragment in production order, then exactly
    /// one terminal `Completed` or `Failed` event.
    pub fn step(&self, transcript: Transcript) -> Pin<Box<dyn Stream<Item = StepEvent> + Send>> {
        let generator = self.generator.clone();
        let per_fragment = self.fragment_timeout;
        debug!("starting step (context_len={})", transcript.len());

        Box::pin(stream::unfold(
            StepPhase::Initial(transcript),
            move |phase| {
                let generator = generator.clone();
                async move {
                    match phase {
                        StepPhase::Initial(transcript) => {
                            match timeout(per_fragment, generator.generate(&transcript)).await {
                                Err(_elapsed) => Some((
                                    StepEvent::Failed(GenerateError::Timeout(per_fragment)),
                                    StepPhase::Terminal,
                                )),
                                Ok(Err(err)) => {
                                    Some((StepEvent::Failed(err), StepPhase::Terminal))
                                }
                                Ok(Ok(fragments)) => {
                                    next_event(fragments, String::new(), per_fragment).await
                                }
                            }
                        }
                        StepPhase::Running { fragments, buffer } => {
                            next_event(fragments, buffer, per_fragment).await
                        }
                        StepPhase::Terminal => None,
                    }
                }
            },
        ))
    }

    /// Non-streaming convenience: drain `step` and return the final message.
    pub async fn complete(&self, transcript: Transcript) -> Result<Message, GenerateError> {
        let mut events = self.step(transcript);
        while let Some(event) = events.next().await {
            match event {
                StepEvent::Fragment(_) => {}
                StepEvent::Completed(message) => return Ok(message),
                StepEvent::Failed(err) => return Err(err),
            }
        }
        // `step` always ends with a terminal event.
        Err(GenerateError::Provider(
            "stream ended without a terminal event".to_string(),
        ))
    }
}

/// Pull the next fragment, skipping empty chunks, and map it to an event.
async fn next_event(
    mut fragments: FragmentStream,
    mut buffer: String,
    per_fragment: Duration,
) -> Option<(StepEvent, StepPhase)> {
    loop {
        match timeout(per_fragment, fragments.next()).await {
            Err(_elapsed) => {
                return Some((
                    StepEvent::Failed(GenerateError::Timeout(per_fragment)),
                    StepPhase::Terminal,
                ));
            }
            Ok(None) => {
                return Some((
                    StepEvent::Completed(Message::assistant(buffer)),
                    StepPhase::Terminal,
                ));
            }
            Ok(Some(Err(err))) => return Some((StepEvent::Failed(err), StepPhase::Terminal)),
            Ok(Some(Ok(text))) => {
                if text.is_empty() {
                    continue;
                }
                buffer.push_str(&text);
                return Some((
                    StepEvent::Fragment(text),
                    StepPhase::Running { fragments, buffer },
                ));
            }
        }
    }
}

