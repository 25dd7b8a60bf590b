pub mod agent;
pub mod config;
pub mod context_guard;
pub mod error;
pub mod event_bus;
pub mod identity;
pub mod memory;
pub mod model;
pub mod provider;
pub mod router;
pub mod scheduler;
pub mod session;
pub mod tools;

/// Convenience re-exports for the most commonly used traits and types across
/// the gateway.
///
/// ```rust
/// use clawpoint::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agent::{AgentLoop, Chunk};
    pub use crate::config::GatewayConfig;
    pub use crate::error::GatewayError;
    pub use crate::event_bus::{AppEvent, EventBus};
    pub use crate::model::{CronAction, CronJob, Message, RunLog, Session};
    pub use crate::provider::{FallbackRouter, LlmProvider, ModelRouter, ProviderRegistry};
    pub use crate::router::MessageRouter;
    pub use crate::scheduler::{CronScheduler, Scheduler};
    pub use crate::session::{InboundContext, SessionManager};
    pub use crate::tools::{Tool, ToolRegistry};
}
