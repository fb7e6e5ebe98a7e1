// src/chat/stream.rs
// Events emitted to the caller of a streaming turn.

use tokio::sync::mpsc;

/// Channel capacity for turn streams. Small on purpose: backpressure from a
/// slow caller should reach the backend stream rather than buffer here.
pub const TURN_CHANNEL_CAPACITY: usize = 32;

/// Events delivered while streaming a turn. Every stream is finite and ends
/// with exactly one `Done` marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Text chunk, forwarded in backend delivery order.
    Delta(String),
    /// Classified failure text; the turn recorded no assistant message.
    Error(String),
    /// End-of-stream marker; always the final event of a turn.
    Done,
}

/// Receiving half of a streaming turn. Dropping it cancels the turn: the
/// pipeline stops forwarding and appends no assistant message.
pub type TurnStream = mpsc::Receiver<TurnEvent>;
