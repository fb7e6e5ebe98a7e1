//! Conversation orchestration engine.
//!
//! One turn = validate input, append the user message, call the model
//! backend (blocking or streaming), append the assistant message, trim the
//! window. Backend failures are classified into safe user-facing text and
//! returned as the turn's result; they are never recorded as assistant
//! messages. Turns for the same session are linearized by a per-session
//! gate; distinct sessions proceed fully in parallel.

pub mod error;
pub mod history;
pub mod message;
pub mod stream;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::llm::provider::ChatBackend;

pub use error::{classify, BackendError, ChatError, ClassifiedError, ErrorCategory};
pub use history::{HistoryStore, Session};
pub use message::{Message, Role};
pub use stream::{TurnEvent, TurnStream, TURN_CHANNEL_CAPACITY};

/// Substituted when the backend succeeds but produces a blank completion.
const EMPTY_COMPLETION_FALLBACK: &str =
    "I apologize, but I'm unable to generate a response at this time. Please try again.";

/// The response pipeline. Cheap to share behind an `Arc`; all methods take
/// `&self`.
pub struct ChatEngine {
    backend: Arc<dyn ChatBackend>,
    history: HistoryStore,
    system_prompt: String,
}

impl ChatEngine {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        system_prompt: impl Into<String>,
        history_window: usize,
    ) -> Self {
        let system_prompt = system_prompt.into();
        info!(
            "🚀 Chat engine initialized (backend={}, history_window={}, system_prompt={} chars)",
            backend.name(),
            history_window,
            system_prompt.len()
        );
        Self {
            backend,
            history: HistoryStore::new(history_window),
            system_prompt,
        }
    }

    /// Run one blocking turn. On backend failure the classified user text is
    /// returned as the result; only `ChatError::EmptyMessage` surfaces as an
    /// error, for blank input. `caller` is ephemeral per-call context, used
    /// for attribution only, never persisted.
    pub async fn send_turn(
        &self,
        session_id: &str,
        user_text: &str,
        caller: Option<&str>,
    ) -> Result<String, ChatError> {
        if user_text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let session = self.history.get_or_create(session_id);
        let _turn = session.lock_turn().await;

        info!(
            "💬 Turn for session {} (caller={})",
            session_id,
            caller.unwrap_or("-")
        );
        self.append_user(&session, user_text);

        match self.backend.complete(&session.snapshot()).await {
            Ok(completion) => {
                let text = if completion.text.trim().is_empty() {
                    warn!("⚠️ Empty completion for session {}, using fallback", session_id);
                    EMPTY_COMPLETION_FALLBACK.to_string()
                } else {
                    completion.text
                };
                session.append(Role::Assistant, &text);
                session.trim_to(self.history.window());
                Ok(text)
            }
            Err(e) => {
                let classified = classify(&e);
                warn!(
                    "⚠️ Backend failure for session {} ({:?}): {}",
                    session_id, classified.category, e
                );
                Ok(classified.user_message)
            }
        }
    }

    /// Run one streaming turn. Chunks are forwarded in backend order; the
    /// stream always terminates with `TurnEvent::Done`. Dropping the receiver
    /// cancels the turn: forwarding stops and no assistant message is
    /// recorded.
    pub async fn stream_turn(
        &self,
        session_id: &str,
        user_text: &str,
        caller: Option<&str>,
    ) -> Result<TurnStream, ChatError> {
        if user_text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let (tx, rx) = mpsc::channel(TURN_CHANNEL_CAPACITY);
        let session = self.history.get_or_create(session_id);
        let backend = Arc::clone(&self.backend);
        let system_prompt = self.system_prompt.clone();
        let window = self.history.window();
        let user_text = user_text.to_string();

        info!(
            "📡 Streaming turn for session {} (caller={})",
            session_id,
            caller.unwrap_or("-")
        );
        tokio::spawn(run_streaming_turn(
            session,
            backend,
            system_prompt,
            window,
            user_text,
            tx,
        ));

        Ok(rx)
    }

    /// Drop a session's history entirely. Returns the removed message count.
    pub fn clear_session(&self, session_id: &str) -> usize {
        let removed = self.history.clear(session_id);
        info!("🧹 Cleared session {} ({} messages)", session_id, removed);
        removed
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.history.session_count()
    }

    /// Message count for one session.
    pub fn session_size(&self, session_id: &str) -> usize {
        self.history.size(session_id)
    }

    /// Read snapshot of one session's history; empty for unknown ids.
    pub fn session_history(&self, session_id: &str) -> Vec<Message> {
        self.history
            .get(session_id)
            .map(|s| s.snapshot())
            .unwrap_or_default()
    }

    /// Confirm the backend is configured and reachable. Touches no session
    /// state.
    pub async fn is_healthy(&self) -> bool {
        match self.backend.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Health check failed: {}", e);
                false
            }
        }
    }

    /// Append the user message, opening the session with the configured
    /// system message if this is its first turn.
    fn append_user(&self, session: &Session, user_text: &str) {
        if session.is_empty() {
            session.append(Role::System, &self.system_prompt);
        }
        session.append(Role::User, user_text);
    }
}

/// Body of a streaming turn. Holds the session's turn gate for its entire
/// run; the guard drops on every exit path, including cancellation.
async fn run_streaming_turn(
    session: Arc<Session>,
    backend: Arc<dyn ChatBackend>,
    system_prompt: String,
    window: usize,
    user_text: String,
    tx: mpsc::Sender<TurnEvent>,
) {
    let _turn = session.lock_turn().await;

    if session.is_empty() {
        session.append(Role::System, &system_prompt);
    }
    session.append(Role::User, &user_text);

    let mut chunks = match backend.stream(&session.snapshot()).await {
        Ok(rx) => rx,
        Err(e) => {
            emit_classified(&tx, &session, &e).await;
            return;
        }
    };

    let mut full_text = String::new();
    while let Some(item) = chunks.recv().await {
        match item {
            Ok(chunk) => {
                if tx.send(TurnEvent::Delta(chunk.text.clone())).await.is_err() {
                    // Caller went away; abandon the turn without recording
                    // a partial assistant message.
                    info!("Stream for session {} cancelled by caller", session.id());
                    return;
                }
                full_text.push_str(&chunk.text);
            }
            Err(e) => {
                emit_classified(&tx, &session, &e).await;
                return;
            }
        }
    }

    // Stream complete: coalesce the chunks into a single assistant message.
    if full_text.trim().is_empty() {
        warn!("⚠️ Empty stream for session {}, recording nothing", session.id());
    } else {
        session.append(Role::Assistant, &full_text);
        session.trim_to(window);
        info!(
            "✅ Streaming turn complete for session {} ({} chars)",
            session.id(),
            full_text.len()
        );
    }
    let _ = tx.send(TurnEvent::Done).await;
}

/// Emit the classified form of a backend failure, then the end marker. The
/// turn records no assistant message.
async fn emit_classified(tx: &mpsc::Sender<TurnEvent>, session: &Session, err: &BackendError) {
    let classified = classify(err);
    warn!(
        "⚠️ Streaming backend failure for session {} ({:?}): {}",
        session.id(),
        classified.category,
        err
    );
    let _ = tx.send(TurnEvent::Error(classified.user_message)).await;
    let _ = tx.send(TurnEvent::Done).await;
}
