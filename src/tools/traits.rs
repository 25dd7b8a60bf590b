//! Tool descriptor contract (spec §3 "Tool descriptor", §4.9).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// The result of executing a [`Tool`] handler, before [`super::registry::ToolRegistry::execute`]
/// normalizes it into the spec's `{success, data, error, meta}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub output: String,
    pub success: bool,
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self { output: output.into(), success: true, metadata: None }
    }

    pub fn err(output: impl Into<String>) -> Self {
        Self { output: output.into(), success: false, metadata: None }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A named, schema-declaring handler registered in the Tool Registry.
/// Implementations must be `Send + Sync` so they can be held behind a shared
/// `Arc<dyn Tool>` (spec §3 "Tool descriptor": name, description, parameter
/// schema, handler reference).
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique, lowercase identifier (spec §3 invariant: names are unique
    /// within a registry instance).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Structured document declaring named fields, types, and required
    /// status (spec §3).
    fn schema(&self) -> Value;

    /// Per-tool execution bound (spec §5 "tool executions are bounded by the
    /// per-tool declared timeout"). Defaults to 30 s; handlers wrapping slow
    /// external calls should override it.
    fn timeout_secs(&self) -> u64 {
        DEFAULT_TOOL_TIMEOUT_SECS
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String>;
}

/// Summary of a registered tool, suitable for the provider tool-calling wire
/// format (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub schema: Value,
}
