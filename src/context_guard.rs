//! Context Guard (spec §4.6): token-budget estimation and pairing-preserving
//! truncation. Grounded on the grounding codebase's `ContextManager` token
//! estimator, extended with the tool-call/tool-result pairing guarantee its
//! `truncate_to_fit` never enforced.

use crate::model::Message;

/// Rough per-message wire overhead (role tag, delimiters) added on top of
/// character-based estimation.
const PER_MESSAGE_OVERHEAD_TOKENS: u32 = 4;

#[derive(Debug, Clone, Copy)]
pub struct ContextWindow {
    pub total_tokens: u32,
    pub warning_threshold: u32,
    pub blocking_threshold: u32,
}

impl ContextWindow {
    pub fn new(total_tokens: u32) -> Self {
        Self { total_tokens, warning_threshold: 32_000, blocking_threshold: 16_000 }
    }
}

#[derive(Debug, Clone)]
pub struct GuardReport {
    pub estimated_tokens: u32,
    pub remaining_tokens: u32,
    pub should_warn: bool,
    pub should_block: bool,
}

/// `⌈chars/4⌉` plus a small per-message overhead (spec §4.6).
pub fn estimate_tokens(messages: &[Message]) -> u32 {
    messages
        .iter()
        .map(|m| {
            let chars = m.content.chars().count() as u32;
            chars.div_ceil(4) + PER_MESSAGE_OVERHEAD_TOKENS
        })
        .sum()
}

pub fn check(messages: &[Message], window: ContextWindow) -> GuardReport {
    let estimated = estimate_tokens(messages);
    let remaining = window.total_tokens.saturating_sub(estimated);
    GuardReport {
        estimated_tokens: estimated,
        remaining_tokens: remaining,
        should_warn: remaining <= window.warning_threshold,
        should_block: remaining <= window.blocking_threshold,
    }
}

/// Removes the oldest messages until the remaining sequence's estimated size
/// is at or under `target_tokens`, always keeping a leading system message
/// and never splitting an assistant-with-tool-calls from its tool-result
/// messages (spec §3, §4.6).
pub fn truncate(messages: &[Message], target_tokens: u32) -> Vec<Message> {
    if messages.is_empty() {
        return Vec::new();
    }

    let system_prefix_len = if matches!(messages[0].role, crate::model::Role::System) { 1 } else { 0 };
    let system_prefix = &messages[..system_prefix_len];
    let rest = &messages[system_prefix_len..];

    let mut start = 0;
    while start < rest.len() {
        let candidate = &rest[start..];
        let total = estimate_tokens(system_prefix) + estimate_tokens(candidate);
        if total <= target_tokens || candidate.len() <= 1 {
            break;
        }
        start += 1;
    }

    // If the cut point lands on a tool-role message, its pairing assistant
    // was dropped; walk backward to the assistant that issued the call.
    while start > 0 && start < rest.len() && matches!(rest[start].role, crate::model::Role::Tool) {
        start -= 1;
    }

    let mut result = system_prefix.to_vec();
    result.extend_from_slice(&rest[start..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Message, ToolCall};
    use std::collections::HashMap;

    #[test]
    fn estimate_counts_four_chars_per_token_plus_overhead() {
        let messages = vec![Message::user("12345678")];
        assert_eq!(estimate_tokens(&messages), 2 + PER_MESSAGE_OVERHEAD_TOKENS);
    }

    #[test]
    fn check_flags_blocking_when_remaining_is_low() {
        let messages = vec![Message::user("x".repeat(100))];
        let window = ContextWindow { total_tokens: 30, warning_threshold: 20, blocking_threshold: 10 };
        let report = check(&messages, window);
        assert!(report.should_block);
        assert!(report.should_warn);
    }

    #[test]
    fn truncate_keeps_leading_system_message() {
        let mut messages = vec![Message::system("be helpful")];
        for i in 0..50 {
            messages.push(Message::user(format!("message {i}")));
        }
        let truncated = truncate(&messages, 50);
        assert!(matches!(truncated[0].role, crate::model::Role::System));
        assert!(truncated.len() < messages.len());
    }

    #[test]
    fn truncate_never_separates_tool_call_from_its_result() {
        let mut messages = vec![Message::system("sys")];
        for i in 0..20 {
            messages.push(Message::user(format!("filler {i}")));
        }
        let call = ToolCall { id: "c1".into(), name: "get_time".into(), args: HashMap::new() };
        messages.push(Message::assistant_with_tool_calls("", vec![call]));
        messages.push(Message::tool_result("c1", "12:00", true, 5));
        messages.push(Message::user("thanks"));

        let truncated = truncate(&messages, 40);
        let has_tool_result = truncated.iter().any(|m| !m.tool_results.is_empty());
        if has_tool_result {
            let has_call = truncated.iter().any(|m| m.has_tool_calls());
            assert!(has_call, "kept a tool result without its issuing assistant call");
        }
    }
}
