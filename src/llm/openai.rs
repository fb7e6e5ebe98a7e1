// src/llm/openai.rs
// Chat Completions backend over an OpenAI-compatible API. Blocking calls go
// through `complete`; streaming consumes the SSE byte stream and forwards
// text deltas over an mpsc channel, stopping as soon as the receiver is gone.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::chat::error::BackendError;
use crate::chat::message::Message;
use crate::config::PollyConfig;
use crate::llm::provider::{ChatBackend, Completion, StreamChunk};
use crate::llm::sse::SseDecoder;

/// Channel capacity between the SSE reader task and the pipeline.
const STREAM_CHANNEL_CAPACITY: usize = 64;

pub struct OpenAiBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_completion_tokens: usize,
}

impl OpenAiBackend {
    pub fn new(config: &PollyConfig) -> Self {
        if config.openai_api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set; backend calls will fail authentication");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_completion_tokens: config.max_completion_tokens,
        }
    }

    fn request_body<'a>(&'a self, messages: &'a [Message], stream: bool) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.temperature,
            max_completion_tokens: self.max_completion_tokens,
            stream,
        }
    }

    async fn post_completions(
        &self,
        messages: &[Message],
        stream: bool,
    ) -> Result<reqwest::Response, BackendError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages, stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, messages: &[Message]) -> Result<Completion, BackendError> {
        let response = self.post_completions(messages, false).await?;
        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Protocol(e.to_string()))?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(Completion { text })
    }

    async fn stream(
        &self,
        messages: &[Message],
    ) -> Result<mpsc::Receiver<Result<StreamChunk, BackendError>>, BackendError> {
        let response = self.post_completions(messages, true).await?;

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(forward_sse(response, tx));
        Ok(rx)
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let response = self
            .http
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: "health probe rejected".into(),
            });
        }
        Ok(())
    }
}

/// Read the SSE body and forward text deltas. Exits on `[DONE]`, on a
/// transport error (forwarded to the channel), or when the receiver is
/// dropped.
async fn forward_sse(
    response: reqwest::Response,
    tx: mpsc::Sender<Result<StreamChunk, BackendError>>,
) {
    let mut bytes = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = bytes.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.send(Err(e.into())).await;
                return;
            }
        };

        for frame in decoder.feed(&chunk) {
            if frame.is_done() {
                return;
            }
            let payload: StreamPayload = match frame.parse() {
                Ok(p) => p,
                Err(e) => {
                    debug!("Skipping unparseable SSE frame: {}", e);
                    continue;
                }
            };
            if let Some(error) = payload.error {
                let _ = tx
                    .send(Err(BackendError::Protocol(
                        error
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("backend stream error")
                            .to_string(),
                    )))
                    .await;
                return;
            }
            for choice in payload.choices {
                if let Some(content) = choice.delta.content {
                    if content.is_empty() {
                        continue;
                    }
                    if tx.send(Ok(StreamChunk { text: content })).await.is_err() {
                        // Receiver dropped: the turn was cancelled.
                        return;
                    }
                }
            }
        }
    }
}

/// Pull a human-readable message out of an error response body, which is
/// usually `{"error": {"message": ...}}` but not reliably so.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.chars().take(300).collect())
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f64,
    max_completion_tokens: usize,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamPayload {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}
