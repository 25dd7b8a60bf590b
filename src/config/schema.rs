//! TOML configuration schema for the gateway (spec §6 External Interfaces).
//!
//! All fields carry `#[serde(default)]` so a partially-filled `config.toml`
//! works correctly; missing sections fall back to their `Default` impl.
//!
//! Example `~/.clawpoint/config.toml`:
//! ```toml
//! default_model = "gpt-4o-mini"
//! failover = ["openai", "anthropic"]
//! max_iterations = 10
//! max_tokens = 4096
//! temperature = 0.7
//! workspace_root = "/home/user/clawpoint-workspace"
//!
//! [providers.openai]
//! base_url = "https://api.openai.com/v1"
//! api_key = "sk-..."
//! models = ["gpt-4o", "gpt-4o-mini"]
//!
//! [memory.compaction]
//! keep_recent_messages = 10
//!
//! [memory.session]
//! idle_timeout_secs = 1800
//! max_messages_before_compact = 100
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One configured LLM provider (spec §3 "Provider descriptor", minus the
/// assigned priority — priority lives in [`RoutingConfig`] since it's a
/// per-task-class ranking, not a fixed per-provider attribute).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ProviderEntry {
    pub base_url: String,
    pub api_key: String,
    pub models: Vec<String>,
}

/// Cost/quality priority lists and substring hints the Model Router's
/// selection rule consumes (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RoutingConfig {
    pub cost_rank: Vec<String>,
    pub quality_rank: Vec<String>,
    pub cheap_hints: Vec<String>,
    pub reasoning_hints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompactionConfig {
    pub keep_recent_messages: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self { keep_recent_messages: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionMemoryConfig {
    pub idle_timeout_secs: u64,
    pub max_messages_before_compact: usize,
}

impl Default for SessionMemoryConfig {
    fn default() -> Self {
        Self { idle_timeout_secs: 30 * 60, max_messages_before_compact: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MemoryConfig {
    pub compaction: CompactionConfig,
    pub session: SessionMemoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { tick_interval_secs: 60 }
    }
}

/// Top-level gateway configuration (spec §6: "the core consumes a validated
/// structure containing at minimum: default model identifier, provider map,
/// failover list, maxIterations, maxTokens, temperature,
/// memory.compaction.keepRecentMessages, memory.session.idleTimeout,
/// memory.session.maxMessagesBeforeCompact, workspace root").
///
/// Loaded from `~/.clawpoint/config.toml`, falling back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub default_model: String,
    pub providers: HashMap<String, ProviderEntry>,
    pub failover: Vec<String>,
    pub max_iterations: u32,
    pub max_tokens: u32,
    pub temperature: f32,
    pub routing: RoutingConfig,
    pub memory: MemoryConfig,
    pub workspace_root: Option<String>,
    pub scheduler: SchedulerConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_owned(),
            providers: HashMap::new(),
            failover: Vec::new(),
            max_iterations: 10,
            max_tokens: 4096,
            temperature: 0.7,
            routing: RoutingConfig::default(),
            memory: MemoryConfig::default(),
            workspace_root: None,
            scheduler: SchedulerConfig::default(),
        }
    }
}
