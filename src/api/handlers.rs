// src/api/handlers.rs
// REST + SSE handlers. The transport owns framing only; every conversational
// decision lives in the engine.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
};
use futures::stream::Stream;
use tracing::info;
use uuid::Uuid;

use crate::chat::{ChatEngine, ChatError, TurnEvent};

use super::types::{ChatRequest, ChatResponse, ClearResponse, HealthResponse, StreamParams};

/// POST /api/chat - one blocking turn.
pub async fn chat(
    State(engine): State<Arc<ChatEngine>>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let session_id = request
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    info!("📨 Chat request from session: {}", session_id);

    match engine
        .send_turn(&session_id, &request.message, request.caller_id.as_deref())
        .await
    {
        Ok(text) => (StatusCode::OK, Json(ChatResponse::text(text, session_id))),
        Err(ChatError::EmptyMessage) => (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse::error(
                "Invalid request: message cannot be empty",
                session_id,
            )),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ChatResponse::error(
                format!("An error occurred processing your request: {e}"),
                session_id,
            )),
        ),
    }
}

/// GET /api/chat/stream/{session_id} - one streaming turn over SSE. Each
/// chunk is one event; the stream ends with `[DONE]`. If the turn dies
/// without its end marker, `[ERROR]` is emitted instead of a broken stream.
pub async fn stream_chat(
    State(engine): State<Arc<ChatEngine>>,
    Path(session_id): Path<String>,
    Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("📡 Stream chat request from session: {}", session_id);

    let stream = async_stream::stream! {
        let mut rx = match engine
            .stream_turn(&session_id, &params.message, params.caller_id.as_deref())
            .await
        {
            Ok(rx) => rx,
            Err(e) => {
                yield Ok(Event::default().data(format!("Invalid request: {e}")));
                yield Ok(Event::default().data("[DONE]"));
                return;
            }
        };

        loop {
            match rx.recv().await {
                Some(TurnEvent::Delta(text)) | Some(TurnEvent::Error(text)) => {
                    yield Ok(Event::default().data(text));
                }
                Some(TurnEvent::Done) => {
                    yield Ok(Event::default().data("[DONE]"));
                    return;
                }
                None => {
                    yield Ok(Event::default().data("[ERROR]"));
                    return;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// DELETE /api/chat/session/{session_id} - drop a session's history.
pub async fn clear_session(
    State(engine): State<Arc<ChatEngine>>,
    Path(session_id): Path<String>,
) -> Json<ClearResponse> {
    info!("🧹 Clear session request: {}", session_id);
    let removed = engine.clear_session(&session_id);
    Json(ClearResponse {
        session_id,
        removed,
    })
}

/// GET /api/chat/health - backend reachability plus live session count.
pub async fn health(State(engine): State<Arc<ChatEngine>>) -> impl IntoResponse {
    let healthy = engine.is_healthy().await;
    let body = HealthResponse {
        healthy,
        active_sessions: engine.session_count(),
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}
