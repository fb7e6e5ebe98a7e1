// tests/engine_turns.rs
// Pipeline behavior against a scripted in-process backend: append shapes,
// streaming order, classification, windowing, linearization, cancellation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use polly::chat::{BackendError, ChatEngine, ChatError, Message, Role, TurnEvent};
use polly::llm::{ChatBackend, Completion, StreamChunk};

/// What the backend should do for every call.
#[derive(Clone)]
enum Behavior {
    /// Echo the last user message, prefixed, after a delay.
    Echo(Duration),
    /// Return a fixed completion text.
    Reply(String),
    /// Fail every call with this error.
    Fail(BackendError),
    /// Stream these chunks, with a delay before each.
    Chunks(Vec<String>, Duration),
    /// Stream these chunks, then fail.
    ChunksThenFail(Vec<String>, BackendError),
}

struct MockBackend {
    behavior: Behavior,
}

impl MockBackend {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self { behavior })
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, messages: &[Message]) -> Result<Completion, BackendError> {
        match &self.behavior {
            Behavior::Echo(delay) => {
                tokio::time::sleep(*delay).await;
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                Ok(Completion {
                    text: format!("echo:{last_user}"),
                })
            }
            Behavior::Reply(text) => Ok(Completion { text: text.clone() }),
            Behavior::Fail(err) => Err(err.clone()),
            _ => panic!("streaming behavior used with complete()"),
        }
    }

    async fn stream(
        &self,
        _messages: &[Message],
    ) -> Result<mpsc::Receiver<Result<StreamChunk, BackendError>>, BackendError> {
        let (tx, rx) = mpsc::channel(8);
        match &self.behavior {
            Behavior::Fail(err) => return Err(err.clone()),
            Behavior::Chunks(chunks, delay) => {
                let chunks = chunks.clone();
                let delay = *delay;
                tokio::spawn(async move {
                    for chunk in chunks {
                        tokio::time::sleep(delay).await;
                        if tx.send(Ok(StreamChunk { text: chunk })).await.is_err() {
                            return;
                        }
                    }
                });
            }
            Behavior::ChunksThenFail(chunks, err) => {
                let chunks = chunks.clone();
                let err = err.clone();
                tokio::spawn(async move {
                    for chunk in chunks {
                        if tx.send(Ok(StreamChunk { text: chunk })).await.is_err() {
                            return;
                        }
                    }
                    let _ = tx.send(Err(err)).await;
                });
            }
            _ => panic!("blocking behavior used with stream()"),
        }
        Ok(rx)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        match &self.behavior {
            Behavior::Fail(err) => Err(err.clone()),
            _ => Ok(()),
        }
    }
}

fn engine(behavior: Behavior, window: usize) -> ChatEngine {
    ChatEngine::new(MockBackend::new(behavior), "system prompt", window)
}

fn roles(history: &[Message]) -> Vec<Role> {
    history.iter().map(|m| m.role).collect()
}

// ── Blocking turns ──────────────────────────────────────────────────────────

#[tokio::test]
async fn successful_turn_appends_user_then_assistant() {
    let engine = engine(Behavior::Reply("sure thing".into()), 20);

    let reply = engine.send_turn("s1", "hello", None).await.unwrap();
    assert_eq!(reply, "sure thing");

    let history = engine.session_history("s1");
    assert_eq!(roles(&history), [Role::System, Role::User, Role::Assistant]);
    assert_eq!(history[1].content, "hello");
    assert_eq!(history[2].content, "sure thing");
    assert!(history.windows(2).all(|w| w[0].sequence < w[1].sequence));
}

#[tokio::test]
async fn blank_input_is_rejected_without_touching_history() {
    let engine = engine(Behavior::Reply("unused".into()), 20);

    let result = engine.send_turn("s1", "   ", None).await;
    assert!(matches!(result, Err(ChatError::EmptyMessage)));
    assert_eq!(engine.session_count(), 0);
}

#[tokio::test]
async fn failed_turn_appends_only_the_user_message() {
    let engine = engine(
        Behavior::Fail(BackendError::Status {
            status: 500,
            message: "upstream broke".into(),
        }),
        20,
    );

    let reply = engine.send_turn("s1", "hello", None).await.unwrap();
    assert!(!reply.is_empty());

    let history = engine.session_history("s1");
    assert_eq!(roles(&history), [Role::System, Role::User]);
}

#[tokio::test]
async fn rate_limited_backend_yields_high_demand_message() {
    let engine = engine(
        Behavior::Fail(BackendError::Status {
            status: 429,
            message: "too many requests".into(),
        }),
        20,
    );

    let reply = engine.send_turn("s1", "hello", None).await.unwrap();
    assert!(reply.contains("high demand"));

    let history = engine.session_history("s1");
    assert_eq!(roles(&history), [Role::System, Role::User]);
}

#[tokio::test]
async fn empty_completion_falls_back_to_apology() {
    let engine = engine(Behavior::Reply(String::new()), 20);

    let reply = engine.send_turn("s1", "hello", None).await.unwrap();
    assert!(reply.contains("unable to generate a response"));

    // The fallback is a real assistant turn, unlike a classified failure.
    let history = engine.session_history("s1");
    assert_eq!(roles(&history), [Role::System, Role::User, Role::Assistant]);
}

// ── Windowing ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_stays_bounded_with_system_message_preserved() {
    let window = 8;
    let engine = engine(Behavior::Reply("ok".into()), window);

    for i in 0..(window + 5) {
        engine.send_turn("s1", &format!("turn {i}"), None).await.unwrap();
    }

    let history = engine.session_history("s1");
    assert_eq!(history.len(), window);
    assert_eq!(history[0].role, Role::System);
    // The tail is the most recent exchange.
    assert_eq!(history.last().unwrap().content, "ok");
    assert_eq!(history[history.len() - 2].content, format!("turn {}", window + 4));
}

// ── Streaming turns ─────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_forwards_chunks_in_order_then_done() {
    let engine = engine(
        Behavior::Chunks(
            vec!["Hel".into(), "lo, ".into(), "world".into()],
            Duration::ZERO,
        ),
        20,
    );

    let mut rx = engine.stream_turn("s1", "greet me", None).await.unwrap();
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(
        events,
        [
            TurnEvent::Delta("Hel".into()),
            TurnEvent::Delta("lo, ".into()),
            TurnEvent::Delta("world".into()),
            TurnEvent::Done,
        ]
    );

    let history = engine.session_history("s1");
    assert_eq!(roles(&history), [Role::System, Role::User, Role::Assistant]);
    assert_eq!(history[2].content, "Hello, world");
}

#[tokio::test]
async fn stream_failure_emits_classified_text_and_records_no_assistant() {
    let engine = engine(
        Behavior::ChunksThenFail(
            vec!["partial".into()],
            BackendError::Transport("network connection failed".into()),
        ),
        20,
    );

    let mut rx = engine.stream_turn("s1", "hello", None).await.unwrap();
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), 3);
    assert_eq!(events[0], TurnEvent::Delta("partial".into()));
    assert!(matches!(&events[1], TurnEvent::Error(text) if text.contains("trouble connecting")));
    assert_eq!(events[2], TurnEvent::Done);

    // The partial text was discarded, not persisted.
    let history = engine.session_history("s1");
    assert_eq!(roles(&history), [Role::System, Role::User]);
}

#[tokio::test]
async fn blank_streaming_input_is_rejected() {
    let engine = engine(Behavior::Chunks(vec!["x".into()], Duration::ZERO), 20);
    assert!(matches!(
        engine.stream_turn("s1", "", None).await,
        Err(ChatError::EmptyMessage)
    ));
}

#[tokio::test]
async fn dropping_the_receiver_cancels_the_turn() {
    let engine = Arc::new(engine(
        Behavior::Chunks(
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            Duration::from_millis(30),
        ),
        20,
    ));

    let mut rx = engine.stream_turn("s1", "hello", None).await.unwrap();
    let first = rx.recv().await;
    assert!(matches!(first, Some(TurnEvent::Delta(_))));
    drop(rx);

    // Give the abandoned turn time to notice and unwind.
    tokio::time::sleep(Duration::from_millis(250)).await;

    let history = engine.session_history("s1");
    assert_eq!(roles(&history), [Role::System, Role::User]);

    // The turn gate was released: a fresh turn on the same session runs.
    let mut rx = engine.stream_turn("s1", "again", None).await.unwrap();
    let mut saw_done = false;
    while let Some(event) = rx.recv().await {
        saw_done = event == TurnEvent::Done;
    }
    assert!(saw_done);
    let history = engine.session_history("s1");
    assert_eq!(history.last().unwrap().role, Role::Assistant);
}

// ── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_turns_on_one_session_are_linearized() {
    let engine = Arc::new(engine(Behavior::Echo(Duration::from_millis(50)), 20));

    let a = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.send_turn("s1", "first", None).await })
    };
    let b = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.send_turn("s1", "second", None).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let history = engine.session_history("s1");
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].role, Role::System);
    // Each (User, Assistant) pair is contiguous: the assistant echoes the
    // user message directly before it, with no interleaving.
    for pair in history[1..].chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].content, format!("echo:{}", pair[0].content));
    }
}

#[tokio::test]
async fn distinct_sessions_do_not_share_a_lock() {
    let engine = Arc::new(engine(Behavior::Echo(Duration::from_millis(300)), 20));

    let started = std::time::Instant::now();
    let a = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.send_turn("s1", "hello", None).await })
    };
    let b = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.send_turn("s2", "hello", None).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // Serialized execution would take >= 600ms.
    assert!(started.elapsed() < Duration::from_millis(550));
    assert_eq!(engine.session_count(), 2);
}

// ── Session lifecycle & health ──────────────────────────────────────────────

#[tokio::test]
async fn clear_session_is_idempotent_and_forgets_the_session() {
    let engine = engine(Behavior::Reply("ok".into()), 20);
    engine.send_turn("s1", "hello", None).await.unwrap();
    assert_eq!(engine.session_count(), 1);

    assert!(engine.clear_session("s1") > 0);
    assert_eq!(engine.clear_session("s1"), 0);
    assert_eq!(engine.session_count(), 0);
    assert!(engine.session_history("s1").is_empty());
}

#[tokio::test]
async fn health_check_does_not_touch_session_state() {
    let engine = engine(Behavior::Reply("ok".into()), 20);
    assert!(engine.is_healthy().await);
    assert_eq!(engine.session_count(), 0);

    let unhealthy = self::engine(
        Behavior::Fail(BackendError::Transport("connection refused".into())),
        20,
    );
    assert!(!unhealthy.is_healthy().await);
    assert_eq!(unhealthy.session_count(), 0);
}
