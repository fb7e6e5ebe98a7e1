// src/chat/history.rs
// Process-wide conversation state: one ordered message buffer per session id.
//
// The outer map lock is only held for lookup/insert/remove; message buffers
// live behind their own lock so sessions never contend with each other. Turn
// serialization (at most one in-flight turn mutating a session's tail) is the
// pipeline's job, via the per-session turn gate exposed here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use super::message::{Message, Role};

/// A single session's state. Owned by the `HistoryStore`; handed out as an
/// `Arc` so a turn keeps working against a stable handle even if the session
/// is cleared mid-flight.
pub struct Session {
    id: String,
    /// Held by the pipeline for the full span of a turn, including the
    /// backend await. Distinct sessions never share this lock.
    turn_gate: tokio::sync::Mutex<()>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    messages: Vec<Message>,
    next_sequence: u64,
}

impl Session {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            turn_gate: tokio::sync::Mutex::new(()),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Acquire the per-session turn gate. The guard must live until the
    /// turn's final history mutation (or its short-circuit) completes.
    pub async fn lock_turn(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.turn_gate.lock().await
    }

    /// Append a message, assigning the next sequence number.
    pub fn append(&self, role: Role, content: &str) -> u64 {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        debug_assert!(
            role != Role::System || inner.messages.is_empty(),
            "system message may only open a session"
        );
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.messages.push(Message::new(role, content, sequence));
        sequence
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("session lock poisoned").messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read snapshot of the current history, in order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.inner
            .lock()
            .expect("session lock poisoned")
            .messages
            .clone()
    }

    /// Trim to at most `window` messages, removing the oldest entries from
    /// position 1 onward so the leading system message survives. Returns the
    /// number of messages removed.
    pub fn trim_to(&self, window: usize) -> usize {
        let mut inner = self.inner.lock().expect("session lock poisoned");
        let mut removed = 0;
        while inner.messages.len() > window && inner.messages.len() > 1 {
            inner.messages.remove(1);
            removed += 1;
        }
        if removed > 0 {
            debug!("Trimmed {} old messages from session {}", removed, self.id);
        }
        removed
    }
}

/// Concurrent map from session id to its message buffer.
///
/// Performs no I/O and never fails. Sessions are created lazily on first use
/// and live until an explicit clear; there is no expiry policy.
pub struct HistoryStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    window: usize,
}

impl HistoryStore {
    pub fn new(window: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            window,
        }
    }

    /// Maximum messages retained per session.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Fetch the session for `id`, creating it if this is the first turn.
    pub fn get_or_create(&self, id: &str) -> Arc<Session> {
        if let Some(session) = self.sessions.read().expect("session map poisoned").get(id) {
            return Arc::clone(session);
        }
        let mut sessions = self.sessions.write().expect("session map poisoned");
        Arc::clone(
            sessions
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Session::new(id))),
        )
    }

    /// Fetch an existing session without creating one.
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .expect("session map poisoned")
            .get(id)
            .map(Arc::clone)
    }

    /// Message count for a session; 0 for unknown ids.
    pub fn size(&self, id: &str) -> usize {
        self.sessions
            .read()
            .expect("session map poisoned")
            .get(id)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Remove a session entirely, returning how many messages it held.
    pub fn clear(&self, id: &str) -> usize {
        let removed = self
            .sessions
            .write()
            .expect("session map poisoned")
            .remove(id)
            .map(|s| s.len())
            .unwrap_or(0);
        if removed > 0 {
            debug!("Cleared session {} ({} messages)", id, removed);
        }
        removed
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.read().expect("session map poisoned").len()
    }
}
