// src/lib.rs

pub mod api;
pub mod chat;
pub mod config;
pub mod llm;
pub mod tools;

pub use chat::{ChatEngine, ChatError, TurnEvent};
pub use config::{PollyConfig, CONFIG};
pub use llm::{ChatBackend, OpenAiBackend};
