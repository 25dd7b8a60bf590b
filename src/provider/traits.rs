//! Provider contract (spec §4.4): a single `chat` operation every backend
//! implements, tool-call-aware in both directions. Grounded on the
//! grounding codebase's `LLMProvider` trait, extended so `ChatResponse`
//! carries structured tool calls rather than plain text only.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;
use crate::model::{Message, ToolCall};

/// A tool schema advertised to the model, JSON-Schema-shaped per the
/// OpenAI function-calling convention the grounding codebase already speaks.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub tools: Vec<ToolSchema>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            tools: Vec::new(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
}

/// spec §4.4: "Each provider exposes a single operation, `chat`."
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stable identifier used in routing tables and attempt logs.
    fn id(&self) -> &str;

    /// Models this provider advertises, in priority order.
    fn models(&self) -> &[String];

    async fn chat(&self, context: &[Message], options: &ChatOptions) -> Result<ChatResponse, ProviderError>;
}
