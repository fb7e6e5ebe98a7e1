// src/chat/error.rs
// Failure taxonomy for the pipeline, plus the classifier that turns raw
// backend failures into safe user-facing text. Nothing here is fatal: backend
// failures are recovered at the turn boundary and surfaced as ordinary text.

use thiserror::Error;

/// Errors surfaced by the pipeline to its immediate caller.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("turn cancelled by caller")]
    Cancelled,
}

/// Raw failures from the model backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Non-success HTTP response from the backend.
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Connection-level failure (DNS, refused, timeout, broken stream).
    #[error("network error: {0}")]
    Transport(String),

    /// The backend answered but the payload made no sense.
    #[error("malformed backend response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Transport(format!("request timeout: {err}"))
        } else if err.is_connect() {
            BackendError::Transport(format!("network connection failed: {err}"))
        } else if err.is_decode() {
            BackendError::Protocol(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// Category assigned to a classified backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimited,
    TooLong,
    NetworkFailure,
    AuthFailure,
    Unknown,
}

/// A backend failure mapped to safe user-facing text. Derived per turn,
/// never persisted.
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub user_message: String,
}

/// Map a raw backend failure onto the fixed category table. First match wins;
/// matching is case-insensitive over the failure text plus any HTTP status.
pub fn classify(err: &BackendError) -> ClassifiedError {
    let status = match err {
        BackendError::Status { status, .. } => Some(*status),
        _ => None,
    };
    let haystack = err.to_string().to_lowercase();

    let (category, user_message) = if status == Some(429)
        || haystack.contains("rate limit")
        || haystack.contains("429")
    {
        (
            ErrorCategory::RateLimited,
            "I'm currently experiencing high demand. Please wait a moment and try again.",
        )
    } else if haystack.contains("token") && haystack.contains("limit") {
        (
            ErrorCategory::TooLong,
            "Your message is too long. Please try with a shorter message.",
        )
    } else if haystack.contains("network") || haystack.contains("timeout") {
        (
            ErrorCategory::NetworkFailure,
            "I'm having trouble connecting right now. Please try again in a few moments.",
        )
    } else if status == Some(401)
        || haystack.contains("authentication")
        || haystack.contains("401")
    {
        (
            ErrorCategory::AuthFailure,
            "There's an authentication issue. Please check your API configuration.",
        )
    } else {
        (
            ErrorCategory::Unknown,
            "I'm sorry, I encountered an error processing your request. Please try again.",
        )
    };

    ClassifiedError {
        category,
        user_message: user_message.to_string(),
    }
}
