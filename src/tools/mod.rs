//! Tool Registry (spec §4.9). Individual tool implementations (file I/O,
//! shell, web search, calendar, browser) are out of scope (spec §1
//! Non-goals) — this module owns only registration and invocation
//! mechanics; callers register whatever [`Tool`] implementations their
//! deployment needs.

pub mod registry;
pub mod schema;
pub mod traits;

pub use registry::ToolRegistry;
pub use schema::{generate_tool_schema_text, generate_tool_summary};
pub use traits::{Tool, ToolInfo, ToolResult};
