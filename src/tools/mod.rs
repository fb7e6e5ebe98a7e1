// src/tools/mod.rs
// Externally-registered callables. The backend owns execution; we only learn
// what exists and give each callable a stable semantic name.

pub mod resolver;

pub use resolver::{resolve_tool_name, ToolNameResolver, UNKNOWN_TOOL};

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// A callable as presented by the tool backend: a provider-defined raw
/// identifier of arbitrary shape, plus whatever description it offers.
#[derive(Debug, Clone)]
pub struct RawTool {
    pub identifier: String,
    pub description: Option<String>,
}

/// A callable after name resolution.
#[derive(Debug, Clone)]
pub struct ResolvedTool {
    pub raw_identifier: String,
    pub name: String,
    pub description: Option<String>,
}

/// Capability exposed by a tool backend: enumerate its callables. Identifier
/// strings come to us directly; no provider object introspection.
#[async_trait]
pub trait ToolSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn list_tools(&self) -> Result<Vec<RawTool>>;
}

/// Fixed tool list, for configuration-driven setups and tests.
pub struct StaticToolSource {
    tools: Vec<RawTool>,
}

impl StaticToolSource {
    pub fn new(identifiers: &[String]) -> Self {
        Self {
            tools: identifiers
                .iter()
                .map(|id| RawTool {
                    identifier: id.clone(),
                    description: None,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ToolSource for StaticToolSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn list_tools(&self) -> Result<Vec<RawTool>> {
        Ok(self.tools.clone())
    }
}

/// The resolved tool set for this process. Tool sets are assumed stable once
/// the backend is connected, so names are resolved once at load.
pub struct ToolCatalog {
    tools: Vec<ResolvedTool>,
}

impl ToolCatalog {
    pub async fn load(source: &dyn ToolSource) -> Result<Self> {
        let resolver = ToolNameResolver::new();
        let raw = source.list_tools().await?;

        let tools: Vec<ResolvedTool> = raw
            .into_iter()
            .map(|tool| {
                let name = resolver.resolve(&tool.identifier);
                info!("🎯 Resolved tool name: {} -> {}", tool.identifier, name);
                ResolvedTool {
                    raw_identifier: tool.identifier,
                    name,
                    description: tool.description,
                }
            })
            .collect();

        info!("🔧 Tool catalog loaded from {}: {} tools", source.name(), tools.len());
        Ok(Self { tools })
    }

    pub fn tools(&self) -> &[ResolvedTool] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up a tool by resolved name.
    pub fn find(&self, name: &str) -> Option<&ResolvedTool> {
        self.tools.iter().find(|t| t.name == name)
    }
}
