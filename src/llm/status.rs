// src/llm/status.rs
// One-shot startup report of the model configuration, so local setups can
// double check token limits before traffic arrives.

use tracing::{info, warn};

use crate::config::PollyConfig;

pub fn report_llm_status(config: &PollyConfig) {
    info!("🤖 ========== LLM STATUS REPORT ==========");
    info!("🧠 Model: {}", or_unknown(&config.model));
    info!("🌐 Base URL: {}", or_unknown(&config.openai_base_url));
    info!("🎛 Temperature: {:.2}", config.temperature);
    info!("🔢 Max Completion Tokens: {}", config.max_completion_tokens);
    info!("🧮 Context Window: {}", config.context_window);

    if config.context_window > 0 && config.max_completion_tokens > 0 {
        if config.max_completion_tokens > config.context_window {
            warn!(
                "⚠️ Completion token cap exceeds context window by {} tokens",
                config.max_completion_tokens - config.context_window
            );
        } else {
            info!(
                "🧾 Prompt Budget (context - completion): {} tokens",
                config.context_window - config.max_completion_tokens
            );
        }
    }

    let prompt_lines = if config.system_prompt.is_empty() {
        0
    } else {
        config.system_prompt.lines().count()
    };
    info!(
        "📏 System Prompt: {} chars across {} lines",
        config.system_prompt.len(),
        prompt_lines
    );
    info!("🤖 ======================================");
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() { "UNKNOWN" } else { value }
}
