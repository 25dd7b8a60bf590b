//! OpenAI-compatible chat-completions HTTP adapter (spec §4.4).
//!
//! Grounded on the grounding codebase's OpenAI-compatible provider; the
//! `app_identity` crate it pulled its OpenRouter attribution headers from
//! does not exist in this workspace, so those two header values are inlined
//! as literal constants below (see DESIGN.md).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{ProviderError, ProviderErrorKind};
use crate::model::{Message, Role, ToolCall};

use super::traits::{ChatOptions, ChatResponse, LlmProvider, TokenUsage};

const OPENROUTER_HTTP_REFERER: &str = "https://clawpoint.dev";
const OPENROUTER_TITLE: &str = "clawpoint";

pub struct OpenAiCompatibleProvider {
    id: String,
    base_url: String,
    api_key: String,
    models: Vec<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>, models: Vec<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            models,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(90),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn to_wire_message(message: &Message) -> Value {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        let mut wire = json!({ "role": role, "content": message.content });
        if !message.tool_calls.is_empty() {
            wire["tool_calls"] = json!(message
                .tool_calls
                .iter()
                .map(|call| json!({
                    "id": call.id,
                    "type": "function",
                    "function": { "name": call.name, "arguments": serde_json::to_string(&call.args).unwrap_or_default() },
                }))
                .collect::<Vec<_>>());
        }
        if let Some(result) = message.tool_results.first() {
            wire["tool_call_id"] = json!(result.call_id);
        }
        wire
    }

    fn classify_status(status: reqwest::StatusCode) -> ProviderErrorKind {
        match status.as_u16() {
            401 | 403 => ProviderErrorKind::Auth,
            402 => ProviderErrorKind::Billing,
            404 => ProviderErrorKind::NotFound,
            422 => ProviderErrorKind::Validation,
            429 => ProviderErrorKind::RateLimit,
            500..=599 => ProviderErrorKind::Provider5xx,
            _ => ProviderErrorKind::Internal,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn models(&self) -> &[String] {
        &self.models
    }

    async fn chat(&self, context: &[Message], options: &ChatOptions) -> Result<ChatResponse, ProviderError> {
        let messages: Vec<Value> = context.iter().map(Self::to_wire_message).collect();
        let mut body = json!({
            "model": options.model,
            "messages": messages,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
        });
        if !options.tools.is_empty() {
            body["tools"] = json!(options
                .tools
                .iter()
                .map(|t| json!({
                    "type": "function",
                    "function": { "name": t.name, "description": t.description, "parameters": t.parameters },
                }))
                .collect::<Vec<_>>());
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", OPENROUTER_HTTP_REFERER)
            .header("X-Title", OPENROUTER_TITLE)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    ProviderErrorKind::Timeout
                } else {
                    ProviderErrorKind::TransientNetwork
                };
                ProviderError { kind, message: e.to_string() }
            })?;

        if !response.status().is_success() {
            let kind = Self::classify_status(response.status());
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError { kind, message });
        }

        let payload: Value = response.json().await.map_err(|e| ProviderError {
            kind: ProviderErrorKind::Internal,
            message: format!("malformed response body: {e}"),
        })?;

        parse_chat_completion(&payload)
    }
}

fn parse_chat_completion(payload: &Value) -> Result<ChatResponse, ProviderError> {
    let choice = payload["choices"].get(0).ok_or_else(|| ProviderError {
        kind: ProviderErrorKind::Internal,
        message: "response contained no choices".into(),
    })?;
    let message = &choice["message"];
    let content = message["content"].as_str().unwrap_or_default().to_string();

    let tool_calls = message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let id = call["id"].as_str()?.to_string();
                    let name = call["function"]["name"].as_str()?.to_string();
                    let args_raw = call["function"]["arguments"].as_str().unwrap_or("{}");
                    let args = serde_json::from_str(args_raw).unwrap_or_default();
                    Some(ToolCall { id, name, args })
                })
                .collect()
        })
        .unwrap_or_default();

    let usage = TokenUsage {
        prompt_tokens: payload["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: payload["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        total_tokens: payload["usage"]["total_tokens"].as_u64().unwrap_or(0) as u32,
    };

    Ok(ChatResponse { content, tool_calls, usage })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_text_completion() {
        let payload = json!({
            "choices": [{ "message": { "role": "assistant", "content": "hello there" } }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13 },
        });
        let response = parse_chat_completion(&payload).unwrap();
        assert_eq!(response.content, "hello there");
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.usage.total_tokens, 13);
    }

    #[test]
    fn parses_tool_call_completion() {
        let payload = json!({
            "choices": [{ "message": { "role": "assistant", "content": "", "tool_calls": [
                { "id": "call_1", "function": { "name": "get_time", "arguments": "{\"tz\":\"UTC\"}" } }
            ] } }],
            "usage": { "prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7 },
        });
        let response = parse_chat_completion(&payload).unwrap();
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "get_time");
    }

    #[test]
    fn missing_choices_is_an_internal_error() {
        let payload = json!({ "choices": [] });
        let err = parse_chat_completion(&payload).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Internal);
    }

    #[test]
    fn classifies_status_codes() {
        assert_eq!(OpenAiCompatibleProvider::classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS), ProviderErrorKind::RateLimit);
        assert_eq!(OpenAiCompatibleProvider::classify_status(reqwest::StatusCode::UNAUTHORIZED), ProviderErrorKind::Auth);
        assert_eq!(OpenAiCompatibleProvider::classify_status(reqwest::StatusCode::BAD_GATEWAY), ProviderErrorKind::Provider5xx);
    }
}
