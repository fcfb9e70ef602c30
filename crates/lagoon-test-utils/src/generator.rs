use async_trait::async_trait;
use futures_util::stream;
use lagoon_core::{FragmentStream, GenerateError, Message, TextGenerator};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Emits the whole response as a single fragment.
#[derive(Debug, Clone)]
pub struct FixedGenerator {
    response: String,
}

impl FixedGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate(&self, _messages: &[Message]) -> Result<FragmentStream, GenerateError> {
        Ok(Box::pin(stream::iter(vec![Ok(self.response.clone())])))
    }
}

/// Emits a fixed sequence of fragments.
#[derive(Debug, Clone)]
pub struct ChunkedGenerator {
    chunks: Vec<String>,
}

impl ChunkedGenerator {
    pub fn new(chunks: Vec<String>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl TextGenerator for ChunkedGenerator {
    async fn generate(&self, _messages: &[Message]) -> Result<FragmentStream, GenerateError> {
        let chunks: Vec<Result<String, GenerateError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

/// Fails immediately when asked to generate.
#[derive(Debug, Clone)]
pub struct FailingGenerator {
    message: String,
}

impl FailingGenerator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _messages: &[Message]) -> Result<FragmentStream, GenerateError> {
        Err(GenerateError::Provider(self.message.clone()))
    }
}

/// Emits some fragments, then fails mid-stream.
#[derive(Debug, Clone)]
pub struct FlakyGenerator {
    chunks: Vec<String>,
    message: String,
}

impl FlakyGenerator {
    pub fn new(chunks: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            chunks,
            message: message.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for FlakyGenerator {
    async fn generate(&self, _messages: &[Message]) -> Result<FragmentStream, GenerateError> {
        let mut items = self.chunks.iter().cloned().map(Ok).collect::<Vec<_>>();
        items.push(Err(GenerateError::Provider(self.message.clone())));
        Ok(Box::pin(stream::iter(items)))
    }
}

/// Never produces a fragment; used for timeout tests.
#[derive(Debug, Clone, Copy)]
pub struct StallingGenerator;

#[async_trait]
impl TextGenerator for StallingGenerator {
    async fn generate(&self, _messages: &[Message]) -> Result<FragmentStream, GenerateError> {
        Ok(Box::pin(stream::pending()))
    }
}

/// Records the context it was handed, then emits a fixed response.
#[derive(Debug, Clone)]
pub struct RecordingGenerator {
    response: String,
    pub last_context: Arc<Mutex<Vec<Message>>>,
}

impl RecordingGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            last_context: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl TextGenerator for RecordingGenerator {
    async fn generate(&self, messages: &[Message]) -> Result<FragmentStream, GenerateError> {
        *self.last_context.lock() = messages.to_vec();
        Ok(Box::pin(stream::iter(vec![Ok(self.response.clone())])))
    }
}

/// Sleeps before emitting a single fragment; used for parallelism tests.
#[derive(Debug, Clone)]
pub struct SlowGenerator {
    delay: Duration,
    response: String,
}

impl SlowGenerator {
    pub fn new(delay: Duration, response: impl Into<String>) -> Self {
        Self {
            delay,
            response: response.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for SlowGenerator {
    async fn generate(&self, _messages: &[Message]) -> Result<FragmentStream, GenerateError> {
        let delay = self.delay;
        let response = self.response.clone();
        Ok(Box::pin(stream::once(async move {
            tokio::time::sleep(delay).await;
            Ok(response)
        })))
    }
}
