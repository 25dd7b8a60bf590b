//! Core data model shared across subsystems (spec §3).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Role of a [`Message`] within a session's ordered history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: HashMap<String, Value>,
}

/// The outcome of executing one [`ToolCall`], carried on a tool-role message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultRef {
    pub call_id: String,
    pub success: bool,
    pub output: String,
    pub duration_ms: u64,
}

/// One entry in a session's message history.
///
/// Invariant (spec §3): any assistant message carrying `tool_calls` must be
/// followed, in the same session, by one tool-role message per call id before
/// the next assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResultRef>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            created_at: Utc::now(),
            channel: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn user_on_channel(content: impl Into<String>, channel: impl Into<String>) -> Self {
        let mut m = Self::new(Role::User, content);
        m.channel = Some(channel.into());
        m
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut m = Self::new(Role::Assistant, content);
        m.tool_calls = tool_calls;
        m
    }

    pub fn tool_result(call_id: impl Into<String>, output: impl Into<String>, success: bool, duration_ms: u64) -> Self {
        let call_id = call_id.into();
        let mut m = Self::new(Role::Tool, output.into());
        m.tool_results = vec![ToolResultRef {
            call_id,
            success,
            output: m.content.clone(),
            duration_ms,
        }];
        m
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Lifecycle state of a [`Session`] (spec §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Created,
    Active,
    Idle,
}

/// Per-sender or per-group conversation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub sender_id: String,
    pub channel: String,
    pub state: SessionState,
    pub messages: Vec<Message>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub bound_model: Option<String>,
    #[serde(default)]
    pub config_overrides: HashMap<String, Value>,
}

impl Session {
    pub fn new(id: impl Into<String>, sender_id: impl Into<String>, channel: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            channel: channel.into(),
            state: SessionState::Created,
            messages: Vec::new(),
            summary: String::new(),
            created_at: now,
            last_active: now,
            bound_model: None,
            config_overrides: HashMap::new(),
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn push(&mut self, message: Message) {
        self.last_active = message.created_at.max(self.last_active);
        self.messages.push(message);
    }
}

/// Action executed when a [`CronJob`] fires (spec §3, §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CronAction {
    Message { channel: String, text: String },
    Tool {
        name: String,
        args: HashMap<String, Value>,
        #[serde(default)]
        send_output: bool,
        channel: Option<String>,
    },
    Agent {
        prompt: String,
        #[serde(default)]
        tool_subset: Option<Vec<String>>,
        channel: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronJob {
    pub id: String,
    pub name: String,
    pub schedule: String,
    pub enabled: bool,
    pub actions: Vec<CronAction>,
    pub timeout_secs: u64,
    pub retry_count: u32,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub fail_count: u64,
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLog {
    pub id: String,
    pub job_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl RunLog {
    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at.map(|end| (end - self.started_at).num_milliseconds())
    }
}
