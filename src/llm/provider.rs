// src/llm/provider.rs
// Capability contract for the model backend: given an ordered message list,
// produce a completion, either as a single result or as an ordered chunk
// stream. The pipeline only ever talks to this trait.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::chat::error::BackendError;
use crate::chat::message::Message;

/// A full, non-streamed completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
}

/// One incremental piece of a streamed completion.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    pub text: String,
}

/// Model backend capability.
///
/// `stream` hands back a receiver; the producing task must stop when the
/// receiver is dropped. Chunks arrive in generation order and their
/// concatenation equals the full completion text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Block for a single completion over the full ordered history.
    async fn complete(&self, messages: &[Message]) -> Result<Completion, BackendError>;

    /// Stream a completion as ordered chunks.
    async fn stream(
        &self,
        messages: &[Message],
    ) -> Result<mpsc::Receiver<Result<StreamChunk, BackendError>>, BackendError>;

    /// Cheap reachability/configuration probe. Must not involve any
    /// conversational state.
    async fn ping(&self) -> Result<(), BackendError>;
}
