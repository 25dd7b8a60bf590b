//! Session key resolution (spec §3 "Session index", §4.2).

use serde::{Deserialize, Serialize};

/// Everything the Session Manager needs to resolve an inbound message to a
/// session: which channel it arrived on, who sent it, and (for group chats)
/// which group it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundContext {
    pub channel: String,
    pub sender_id: String,
    pub is_group: bool,
    pub group_id: Option<String>,
}

impl InboundContext {
    pub fn dm(channel: impl Into<String>, sender_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
            is_group: false,
            group_id: None,
        }
    }

    pub fn group(channel: impl Into<String>, sender_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
            is_group: true,
            group_id: Some(group_id.into()),
        }
    }

    /// The index key used to look up an existing session: group id when this
    /// is a group message, sender id otherwise (spec §4.2 `resolve`).
    pub fn index_key(&self) -> &str {
        if self.is_group {
            self.group_id.as_deref().unwrap_or(&self.sender_id)
        } else {
            &self.sender_id
        }
    }
}
