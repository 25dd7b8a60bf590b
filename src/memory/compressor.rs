//! Memory Compressor (spec §4.8): summarizes a message prefix via the
//! `summarize`-class provider, never degrading memory on failure.

use std::sync::Arc;

use crate::model::Message;
use crate::provider::{ChatOptions, LlmProvider};

const SUMMARY_INSTRUCTION: &str = "Summarize the conversation so far in at most 800 tokens. \
Structure the summary under these headings: User profile, Current task, Decisions, Facts, Recent actions. \
Be concise and factual; omit headings with nothing to report.";

/// spec §4.8: given the prior summary and the messages to compress, produce
/// a new summary. On provider failure, returns the prior summary unchanged.
pub async fn compress(provider: &Arc<dyn LlmProvider>, model: &str, prior_summary: &str, messages: &[Message]) -> String {
    if messages.is_empty() {
        return prior_summary.to_string();
    }

    let mut context = vec![Message::system(SUMMARY_INSTRUCTION)];
    if !prior_summary.trim().is_empty() {
        context.push(Message::system(format!("Prior summary:\n{prior_summary}")));
    }
    context.extend_from_slice(messages);

    let options = ChatOptions::new(model).with_temperature(0.3).with_max_tokens(1000);
    match provider.chat(&context, &options).await {
        Ok(response) if !response.content.trim().is_empty() => response.content,
        _ => prior_summary.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, ProviderErrorKind};
    use crate::provider::{ChatResponse, TokenUsage};
    use async_trait::async_trait;

    struct StubProvider {
        response: Result<String, ProviderErrorKind>,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn id(&self) -> &str {
            "stub"
        }
        fn models(&self) -> &[String] {
            &[]
        }
        async fn chat(&self, _context: &[Message], _options: &ChatOptions) -> Result<ChatResponse, ProviderError> {
            match &self.response {
                Ok(content) => Ok(ChatResponse { content: content.clone(), tool_calls: vec![], usage: TokenUsage::default() }),
                Err(kind) => Err(ProviderError::new(*kind, "boom")),
            }
        }
    }

    #[tokio::test]
    async fn compress_returns_new_summary_on_success() {
        let provider: Arc<dyn LlmProvider> = Arc::new(StubProvider { response: Ok("User profile: ...".into()) });
        let messages = vec![Message::user("hi"), Message::assistant("hello")];
        let summary = compress(&provider, "gpt-4o-mini", "old summary", &messages).await;
        assert_eq!(summary, "User profile: ...");
    }

    #[tokio::test]
    async fn compress_keeps_prior_summary_on_provider_failure() {
        let provider: Arc<dyn LlmProvider> = Arc::new(StubProvider { response: Err(ProviderErrorKind::Provider5xx) });
        let messages = vec![Message::user("hi")];
        let summary = compress(&provider, "gpt-4o-mini", "old summary", &messages).await;
        assert_eq!(summary, "old summary");
    }

    #[tokio::test]
    async fn compress_with_no_messages_returns_prior_summary_unchanged() {
        let provider: Arc<dyn LlmProvider> = Arc::new(StubProvider { response: Ok("ignored".into()) });
        let summary = compress(&provider, "gpt-4o-mini", "old summary", &[]).await;
        assert_eq!(summary, "old summary");
    }
}
