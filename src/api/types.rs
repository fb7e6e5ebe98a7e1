// src/api/types.rs
// Wire DTOs for the REST surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    /// Omitted by first-time callers; the server assigns one.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Optional caller attribution, forwarded to the engine, never stored.
    #[serde(default)]
    pub caller_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ChatResponse {
    pub fn text(response: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            session_id: session_id.into(),
            timestamp: Utc::now(),
            kind: "text".into(),
        }
    }

    pub fn error(message: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            response: message.into(),
            session_id: session_id.into(),
            timestamp: Utc::now(),
            kind: "error".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamParams {
    pub message: String,
    #[serde(default)]
    pub caller_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub session_id: String,
    pub removed: usize,
}
