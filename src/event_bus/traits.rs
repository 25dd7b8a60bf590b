//! Typed event topics for the gateway's publish/subscribe fabric (spec §4.1).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Message;

/// Every event the gateway can emit. Variant names double as topic names
/// (`snake_case`, dotted) via [`AppEvent::topic`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "snake_case")]
pub enum AppEvent {
    MessageInbound { session_id: String, message: Message },
    MessageOutbound { session_id: String, message: Message },
    SessionCreated { session_id: String },
    SessionIdle { session_id: String },
    SessionResumed { session_id: String },
    ToolExecute { session_id: String, tool: String, args: Value },
    ToolComplete { session_id: String, tool: String, result: Value },
    AgentThinking { session_id: String },
    AgentModelUsed { session_id: String, provider: String, model: String, iteration: u32 },
    CronJobStarted { job_id: String },
    CronJobFailed { job_id: String, error: String },
}

impl AppEvent {
    /// Dotted topic name matching spec §4.1's required topic list.
    pub fn topic(&self) -> &'static str {
        match self {
            AppEvent::MessageInbound { .. } => "message.inbound",
            AppEvent::MessageOutbound { .. } => "message.outbound",
            AppEvent::SessionCreated { .. } => "session.created",
            AppEvent::SessionIdle { .. } => "session.idle",
            AppEvent::SessionResumed { .. } => "session.resumed",
            AppEvent::ToolExecute { .. } => "tool.execute",
            AppEvent::ToolComplete { .. } => "tool.complete",
            AppEvent::AgentThinking { .. } => "agent.thinking",
            AppEvent::AgentModelUsed { .. } => "agent.model.used",
            AppEvent::CronJobStarted { .. } => "cron.job.started",
            AppEvent::CronJobFailed { .. } => "cron.job.failed",
        }
    }
}

/// A registered callback for a topic; handlers must not panic across the
/// bus boundary (see [`super::sync_bus::EventBus::publish`]'s unwind catch).
pub type Handler = Box<dyn Fn(&AppEvent) + Send + Sync>;
