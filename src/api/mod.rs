// src/api/mod.rs
// Thin HTTP/SSE transport over the engine's exposed operations.

pub mod handlers;
pub mod types;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::chat::ChatEngine;

pub use types::{ChatRequest, ChatResponse, ClearResponse, HealthResponse};

/// Build the API router around a shared engine.
pub fn router(engine: Arc<ChatEngine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(handlers::chat))
        .route("/api/chat/stream/{session_id}", get(handlers::stream_chat))
        .route(
            "/api/chat/session/{session_id}",
            delete(handlers::clear_session),
        )
        .route("/api/chat/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(engine)
}
