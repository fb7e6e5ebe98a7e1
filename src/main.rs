// src/main.rs

use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use polly::api;
use polly::chat::ChatEngine;
use polly::config::CONFIG;
use polly::llm::{report_llm_status, OpenAiBackend};
use polly::tools::{StaticToolSource, ToolCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let level = CONFIG.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Polly (model={})", CONFIG.model);
    report_llm_status(&CONFIG);

    let backend = Arc::new(OpenAiBackend::new(&CONFIG));
    let engine = Arc::new(ChatEngine::new(
        backend,
        CONFIG.system_prompt.clone(),
        CONFIG.history_window,
    ));

    // Externally-registered tools, when configured. Execution stays with the
    // tool backend; we only resolve and report their names.
    if !CONFIG.tool_identifiers.is_empty() {
        let source = StaticToolSource::new(&CONFIG.tool_identifiers);
        let catalog = ToolCatalog::load(&source).await?;
        info!(
            "Tools available: {}",
            catalog
                .tools()
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let app = api::router(engine);

    let bind_address = format!("{}:{}", CONFIG.host, CONFIG.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
