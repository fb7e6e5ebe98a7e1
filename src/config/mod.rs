// src/config/mod.rs
// All runtime tuning comes from the environment (plus an optional .env file).

use once_cell::sync::Lazy;
use std::str::FromStr;

/// Default system prompt used when SYSTEM_PROMPT is not set.
const DEFAULT_SYSTEM_PROMPT: &str = "You are Polly, an insurance assistant. \
Answer questions about policies, coverage, and claims clearly and concisely. \
If you do not know an answer, say so instead of guessing.";

#[derive(Debug, Clone)]
pub struct PollyConfig {
    // ── Model backend
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub model: String,
    pub temperature: f64,
    pub max_completion_tokens: usize,
    pub context_window: usize,

    // ── Conversation
    pub system_prompt: String,
    pub history_window: usize,

    // ── Tool backend
    pub tool_identifiers: Vec<String>,

    // ── Server
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,

    // ── Logging
    pub log_level: String,
}

/// Read an env var, tolerating inline comments and stray whitespace.
/// Missing or unparseable values fall back to the default.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl PollyConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            eprintln!("Config: no .env file found, using environment variables and defaults");
        }

        let tool_identifiers = std::env::var("TOOL_IDENTIFIERS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        Self {
            openai_base_url: env_var_or("OPENAI_BASE_URL", "https://api.openai.com/v1".to_string()),
            openai_api_key: env_var_or("OPENAI_API_KEY", String::new()),
            model: env_var_or("POLLY_MODEL", "gpt-4o-mini".to_string()),
            temperature: env_var_or("POLLY_TEMPERATURE", 1.0),
            max_completion_tokens: env_var_or("POLLY_MAX_COMPLETION_TOKENS", 2048),
            context_window: env_var_or("POLLY_CONTEXT_WINDOW", 128_000),
            system_prompt: env_var_or("SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT.to_string()),
            history_window: env_var_or("POLLY_HISTORY_WINDOW", 20),
            tool_identifiers,
            host: env_var_or("POLLY_HOST", "0.0.0.0".to_string()),
            port: env_var_or("POLLY_PORT", 8080),
            request_timeout_secs: env_var_or("POLLY_REQUEST_TIMEOUT", 120),
            log_level: env_var_or("POLLY_LOG_LEVEL", "info".to_string()),
        }
    }
}

pub static CONFIG: Lazy<PollyConfig> = Lazy::new(PollyConfig::from_env);
