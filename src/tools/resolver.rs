// src/tools/resolver.rs
// Tool backends hand us raw callable identifiers in inconsistent shapes
// ("mcp_getPolicyVehicles", "get_policy_details", "searchPolicies"...).
// This normalizes them into stable snake_case names the model can reason
// about. Pure and deterministic; the memo wrapper only caches.

use std::collections::HashMap;
use std::sync::RwLock;

/// Placeholder for an absent or empty identifier.
pub const UNKNOWN_TOOL: &str = "unknown_tool";

/// Resolve a raw tool identifier into a stable semantic name.
///
/// Steps: strip the connection prefix (everything up to the first `_`),
/// match the remainder case-insensitively against the known tool table,
/// otherwise convert camelCase to snake_case. Empty input resolves to
/// [`UNKNOWN_TOOL`].
pub fn resolve_tool_name(raw: &str) -> String {
    if raw.is_empty() {
        return UNKNOWN_TOOL.to_string();
    }

    // Connection prefix, e.g. "mcp_getPolicyVehicles" -> "getPolicyVehicles".
    let base = match raw.split_once('_') {
        Some((_, suffix)) => suffix,
        None => raw,
    };

    match base.to_lowercase().as_str() {
        "getpolicyvehicles" | "get_policy_vehicles" => "get_policy_vehicles".to_string(),
        "getpolicydetails" | "get_policy_details" => "get_policy_details".to_string(),
        "searchpolicies" | "search_policies" => "search_policies".to_string(),
        _ => camel_to_snake(base),
    }
}

/// Insert an underscore at each lowercase-to-uppercase boundary and
/// lowercase the result.
fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if prev_lower && c.is_ascii_uppercase() {
            out.push('_');
        }
        prev_lower = c.is_ascii_lowercase();
        out.extend(c.to_lowercase());
    }
    out
}

/// Memoizing wrapper around [`resolve_tool_name`]. Entries are idempotent to
/// recompute, so concurrent insertion of the same key is harmless.
#[derive(Default)]
pub struct ToolNameResolver {
    cache: RwLock<HashMap<String, String>>,
}

impl ToolNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, raw: &str) -> String {
        if let Some(hit) = self.cache.read().expect("resolver cache poisoned").get(raw) {
            return hit.clone();
        }
        let resolved = resolve_tool_name(raw);
        self.cache
            .write()
            .expect("resolver cache poisoned")
            .insert(raw.to_string(), resolved.clone());
        resolved
    }

    pub fn cached_count(&self) -> usize {
        self.cache.read().expect("resolver cache poisoned").len()
    }
}
