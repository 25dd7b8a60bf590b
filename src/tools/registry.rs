use std::{collections::HashMap, sync::Arc, time::Instant};

use serde_json::{json, Value};

use super::traits::{Tool, ToolInfo};

/// Central registry of available tools (spec §4.9).
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// spec §4.9 `register(tool)`. Duplicate names overwrite, with a warning.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            log::warn!("tool_registry: overwriting existing registration for tool '{name}'");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|t| ToolInfo { name: t.name().to_string(), description: t.description().to_string(), schema: t.schema() })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn Tool>)> {
        self.tools.iter()
    }

    /// spec §4.9 `execute(name, args)`: resolves the handler and returns the
    /// normalized envelope `{success, data, error, meta}`. Unknown names and
    /// handler errors both become error envelopes rather than propagated
    /// errors, so the Agent Loop can always render a tool-role message.
    pub async fn execute(&self, name: &str, args: Value) -> Value {
        let started = Instant::now();
        let timestamp = chrono::Utc::now().to_rfc3339();

        let Some(tool) = self.get(name) else {
            return envelope(false, Value::Null, Some(("not_found", format!("unknown tool: {name}"))), started, &timestamp);
        };

        let bound = std::time::Duration::from_secs(tool.timeout_secs());
        match tokio::time::timeout(bound, tool.execute(args)).await {
            Ok(Ok(result)) => {
                let data = json!({ "output": result.output, "metadata": result.metadata });
                if result.success {
                    envelope(true, data, None, started, &timestamp)
                } else {
                    envelope(false, data, Some(("tool_failure", result.output)), started, &timestamp)
                }
            }
            Ok(Err(message)) => envelope(false, Value::Null, Some(("execution_error", message)), started, &timestamp),
            Err(_) => envelope(false, Value::Null, Some(("timeout", format!("tool '{name}' exceeded its {}s timeout", tool.timeout_secs()))), started, &timestamp),
        }
    }
}

fn envelope(success: bool, data: Value, error: Option<(&str, String)>, started: Instant, timestamp: &str) -> Value {
    json!({
        "success": success,
        "data": if success { data } else { Value::Null },
        "error": error.map(|(code, message)| json!({ "code": code, "message": message })),
        "meta": { "duration_ms": started.elapsed().as_millis() as u64, "timestamp": timestamp },
    })
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
