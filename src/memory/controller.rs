//! Memory Controller (spec §4.7): assembles a turn's context window out of
//! the system prompt, the compressed summary, and a pairing-preserving
//! trailing-message window.

use crate::context_guard::{check, ContextWindow};
use crate::identity::IdentityLoader;
use crate::memory::daily::DailyMemory;
use crate::model::{Message, Role, Session};
use crate::tools::ToolRegistry;

const DEFAULT_KEEP_RECENT: usize = 10;
const DEFAULT_MAX_MESSAGES_BEFORE_COMPACT: usize = 100;

pub struct MemoryController {
    identity: IdentityLoader,
    daily: DailyMemory,
    keep_recent: usize,
    max_messages_before_compact: usize,
}

impl MemoryController {
    pub fn new(identity: IdentityLoader, daily: DailyMemory) -> Self {
        Self { identity, daily, keep_recent: DEFAULT_KEEP_RECENT, max_messages_before_compact: DEFAULT_MAX_MESSAGES_BEFORE_COMPACT }
    }

    pub fn with_keep_recent(mut self, keep_recent: usize) -> Self {
        self.keep_recent = keep_recent;
        self
    }

    /// spec §4.7 `buildContext(session)`.
    pub fn build_context(&self, session: &Session, tool_registry: &ToolRegistry) -> Vec<Message> {
        let tool_schema_text = crate::tools::generate_tool_schema_text(tool_registry);
        let mut system_prompt = self.identity.build_system_prompt(&tool_schema_text);
        let daily_context = self.daily.build_daily_context();
        if !daily_context.is_empty() {
            system_prompt = format!("{system_prompt}\n\n---\n\n# Recent notes\n\n{daily_context}");
        }

        let mut messages = vec![Message::system(system_prompt)];
        if !session.summary.trim().is_empty() {
            messages.push(Message::system(format!("# Conversation summary\n\n{}", session.summary)));
        }
        messages.extend(keep_recent_pairing_preserving(&session.messages, self.keep_recent));
        messages
    }

    /// spec §4.7 `needsCompression(session)`.
    pub fn needs_compression(&self, session: &Session, window: ContextWindow) -> bool {
        if session.messages.len() > self.max_messages_before_compact {
            return true;
        }
        check(&session.messages, window).should_block
    }

    /// spec §4.7 `getMessagesForCompression(session)`: the prefix excluded
    /// from the keep-recent window.
    pub fn messages_for_compression<'a>(&self, session: &'a Session) -> &'a [Message] {
        let keep_from = keep_recent_start_index(&session.messages, self.keep_recent);
        &session.messages[..keep_from]
    }
}

/// Finds the index where the trailing keep-recent window starts, extended
/// backward so it never splits a tool-call/tool-result pair.
fn keep_recent_start_index(messages: &[Message], keep_recent: usize) -> usize {
    if messages.len() <= keep_recent {
        return 0;
    }
    let mut start = messages.len() - keep_recent;
    while start > 0 && matches!(messages[start].role, Role::Tool) {
        start -= 1;
    }
    start
}

fn keep_recent_pairing_preserving(messages: &[Message], keep_recent: usize) -> Vec<Message> {
    let start = keep_recent_start_index(messages, keep_recent);
    messages[start..].to_vec()
}

/// spec §4.7 `applyCompression(session, newSummary)`.
pub fn apply_compression(session: &mut Session, new_summary: String, keep_recent: usize) {
    let start = keep_recent_start_index(&session.messages, keep_recent);
    session.messages.drain(..start);
    session.summary = new_summary;
}
