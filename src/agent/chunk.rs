//! Chunk stream contract (spec §4.10): what the Agent Loop emits to a
//! transport over the course of one turn. Every turn ends with exactly one
//! terminal `Done` or `Error`.

use crate::provider::TokenUsage;

#[derive(Debug, Clone)]
pub enum Chunk {
    Thinking { text: Option<String> },
    Text { content: String },
    ToolCall { id: String, name: String, args: serde_json::Value },
    ToolResult { id: String, output: String, success: bool },
    Error { content: String },
    Done { usage: Option<TokenUsage>, provider_id: Option<String>, model: Option<String> },
}

impl Chunk {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Chunk::Done { .. } | Chunk::Error { .. })
    }
}
