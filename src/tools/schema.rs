//! Tool description rendering for LLM context (spec §4.7 "the available-tool
//! list (names + descriptions) is appended").

use super::registry::ToolRegistry;

/// Markdown block listing every registered tool's name, description, and
/// parameter schema, suitable for appending to the Memory Controller's
/// assembled system prompt.
pub fn generate_tool_schema_text(registry: &ToolRegistry) -> String {
    let tools = registry.list();
    if tools.is_empty() {
        return "*No tools available.*\n".to_string();
    }

    let mut output = String::from("# Available Tools\n\n");
    for tool in tools {
        output += &format!("## {}\n\n{}\n\n**Parameters:**\n```json\n", tool.name, tool.description);
        output += &serde_json::to_string_pretty(&tool.schema).unwrap_or_else(|e| {
            log::warn!("tools::schema: failed to serialize schema for tool {}: {e}", tool.name);
            format!("{{\"error\": \"{e}\"}}")
        });
        output += "\n```\n\n";
    }
    output
}

/// Compact one-line tool name list for low-token-budget contexts.
pub fn generate_tool_summary(registry: &ToolRegistry) -> String {
    let tools = registry.list();
    if tools.is_empty() {
        return "No tools available.".to_string();
    }
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    format!("Available tools: {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::traits::{Tool, ToolResult};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct TestTool;

    #[async_trait]
    impl Tool for TestTool {
        fn name(&self) -> &str {
            "web_search"
        }
        fn description(&self) -> &str {
            "Search the web"
        }
        fn schema(&self) -> Value {
            json!({"type": "object", "properties": {"query": {"type": "string"}}})
        }
        async fn execute(&self, _args: Value) -> Result<ToolResult, String> {
            Ok(ToolResult::ok("done"))
        }
    }

    #[test]
    fn generates_schema_for_registered_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(TestTool));
        let output = generate_tool_schema_text(&registry);
        assert!(output.contains("web_search"));
        assert!(output.contains("Search the web"));
    }

    #[test]
    fn generates_placeholder_for_no_tools() {
        let registry = ToolRegistry::new();
        assert!(generate_tool_schema_text(&registry).contains("No tools available"));
    }

    #[test]
    fn summary_lists_tool_names() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(TestTool));
        assert!(generate_tool_summary(&registry).contains("web_search"));
    }
}
