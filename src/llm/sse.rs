// src/llm/sse.rs
// Minimal SSE decoder for the backend's streaming responses. Byte chunks go
// in, complete `data:` frames come out; partial lines stay buffered until the
// rest arrives. The buffer is bounded so a malformed stream cannot grow it
// without limit.

use serde::de::DeserializeOwned;

use crate::chat::error::BackendError;

/// Upper bound on buffered, not-yet-terminated line data (1 MiB).
const MAX_BUFFER: usize = 1024 * 1024;

/// Incremental SSE decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every complete frame it finished.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        if self.buffer.len() > MAX_BUFFER {
            tracing::warn!("SSE buffer exceeded {} bytes, truncating", MAX_BUFFER);
            let mut keep_from = self.buffer.len() - MAX_BUFFER / 2;
            while !self.buffer.is_char_boundary(keep_from) {
                keep_from += 1;
            }
            self.buffer.drain(..keep_from);
        }

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                frames.push(SseFrame {
                    data: data.trim_start().to_string(),
                });
            }
        }
        frames
    }

    /// Whether a partial line is still buffered.
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty()
    }
}

/// One complete `data:` frame.
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub data: String,
}

impl SseFrame {
    /// The `[DONE]` sentinel terminating OpenAI-style streams.
    pub fn is_done(&self) -> bool {
        self.data == "[DONE]"
    }

    /// Parse the frame payload as JSON.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, BackendError> {
        serde_json::from_str(&self.data).map_err(|e| {
            BackendError::Protocol(format!("bad SSE frame ({}): {}", e, self.preview()))
        })
    }

    fn preview(&self) -> &str {
        if self.data.len() <= 200 {
            return &self.data;
        }
        let mut end = 200;
        while !self.data.is_char_boundary(end) {
            end -= 1;
        }
        &self.data[..end]
    }
}
