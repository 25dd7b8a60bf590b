use serde::{Deserialize, Serialize};

/// Metadata parsed from the identity-meta document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMeta {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for IdentityMeta {
    fn default() -> Self {
        Self { name: "Clawpoint".to_string(), version: "0.1.0".to_string(), description: String::new() }
    }
}

/// The reduced five-document identity set (spec §4.7): personality,
/// user-facts, identity metadata, long-term memory, and boot checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub personality: String,
    pub user_facts: String,
    pub meta: IdentityMeta,
    pub long_term_memory: String,
    pub boot: String,
}

pub const IDENTITY_FILES: &[(&str, &str)] = &[
    ("PERSONALITY.md", "Agent personality and tone"),
    ("USER_FACTS.md", "Known facts about the user"),
    ("IDENTITY.md", "Agent name and metadata"),
    ("LONG_TERM_MEMORY.md", "Durable facts carried across sessions"),
    ("BOOT.md", "One-time bootstrap prompt, replaces the normal prompt when present"),
];
