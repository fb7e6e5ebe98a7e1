// src/chat/message.rs
// A single conversational turn. Messages are immutable once created; ordering
// within a session comes from the strictly increasing `sequence` field.

use serde::{Deserialize, Serialize};

/// Speaker role for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub sequence: u64,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, sequence: u64) -> Self {
        Self {
            role,
            content: content.into(),
            sequence,
        }
    }
}
