//! Identity document loading and system-prompt assembly (spec §4.7).
//!
//! Grounded on the grounding codebase's `IdentityLoader` (disk-backed,
//! defaults-on-first-run, file watcher), reduced to the specification's
//! five-document set and extended with the "emptiness" placeholder filter
//! and bootstrap-prompt branching the grounding codebase never had.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use super::types::{Identity, IdentityMeta, IDENTITY_FILES};

/// Marker left in every embedded default so the emptiness heuristic can
/// recognize "never customized" documents without guessing at prose.
const EMPTY_MARKER: &str = "<!-- clawpoint: no custom content yet -->";

const DEFAULT_PERSONALITY: &str = "# Personality\n\nYou are a helpful, direct personal assistant.\n\n<!-- clawpoint: no custom content yet -->\n";
const DEFAULT_USER_FACTS: &str = "# User facts\n\n<!-- clawpoint: no custom content yet -->\n";
const DEFAULT_IDENTITY_META: &str = "name: Clawpoint\nversion: 0.1.0\ndescription: <!-- clawpoint: no custom content yet -->\n";
const DEFAULT_LONG_TERM_MEMORY: &str = "# Long-term memory\n\n<!-- clawpoint: no custom content yet -->\n";
const DEFAULT_BOOT: &str = "<!-- clawpoint: no custom content yet -->\n";

/// A document counts as empty (filtered from the assembled prompt) when it
/// carries only the untouched default marker, or no non-blank content at
/// all (spec §4.7 "emptiness heuristic").
fn is_empty_document(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed.is_empty() || trimmed == EMPTY_MARKER || content.contains(EMPTY_MARKER) && trimmed.lines().filter(|l| !l.trim().is_empty() && !l.contains(EMPTY_MARKER) && !l.trim_start().starts_with('#')).count() == 0
}

pub struct IdentityLoader {
    dir: PathBuf,
    identity: Mutex<Identity>,
}

impl IdentityLoader {
    pub fn new(dir: PathBuf) -> Result<Self, String> {
        ensure_defaults(&dir)?;
        let identity = load_from_dir(&dir)?;
        Ok(Self { dir, identity: Mutex::new(identity) })
    }

    pub fn get(&self) -> Identity {
        self.identity.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn reload(&self) -> Result<(), String> {
        let updated = load_from_dir(&self.dir)?;
        *self.identity.lock().unwrap_or_else(|e| e.into_inner()) = updated;
        Ok(())
    }

    pub fn update_file(&self, file_name: &str, content: &str) -> Result<(), String> {
        validate_file_name(file_name)?;
        fs::write(self.dir.join(file_name), content).map_err(|e| format!("failed to write '{file_name}': {e}"))?;
        self.reload()
    }

    /// spec §4.7 step 1: assembled system prompt, or the bootstrap prompt
    /// when `BOOT.md` carries genuine (non-placeholder) content.
    pub fn build_system_prompt(&self, tool_schema_text: &str) -> String {
        let id = self.get();
        if !is_empty_document(&id.boot) {
            return format!("{}\n\n---\n\n{}", id.boot.trim(), tool_schema_text);
        }

        let mut sections = Vec::new();
        if !is_empty_document(&id.personality) {
            sections.push(format!("# Personality\n\n{}", id.personality.trim()));
        }
        if !is_empty_document(&id.user_facts) {
            sections.push(format!("# User facts\n\n{}", id.user_facts.trim()));
        }
        if !id.meta.description.trim().is_empty() && id.meta.description.trim() != "<!-- clawpoint: no custom content yet -->" {
            sections.push(format!("# Identity\n\nname: {}\ndescription: {}", id.meta.name, id.meta.description));
        }
        if !is_empty_document(&id.long_term_memory) {
            sections.push(format!("# Long-term memory\n\n{}", id.long_term_memory.trim()));
        }
        sections.push(format!("# Available Tools\n\n{tool_schema_text}"));
        sections.join("\n\n---\n\n")
    }
}

fn default_for(name: &str) -> &'static str {
    match name {
        "PERSONALITY.md" => DEFAULT_PERSONALITY,
        "USER_FACTS.md" => DEFAULT_USER_FACTS,
        "IDENTITY.md" => DEFAULT_IDENTITY_META,
        "LONG_TERM_MEMORY.md" => DEFAULT_LONG_TERM_MEMORY,
        "BOOT.md" => DEFAULT_BOOT,
        _ => "",
    }
}

fn ensure_defaults(dir: &Path) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|e| format!("failed to create identity dir: {e}"))?;
    for (name, _) in IDENTITY_FILES {
        let path = dir.join(name);
        if !path.exists() {
            fs::write(&path, default_for(name)).map_err(|e| format!("failed to write default {name}: {e}"))?;
        }
    }
    Ok(())
}

fn load_from_dir(dir: &Path) -> Result<Identity, String> {
    let read = |name: &str| -> String { fs::read_to_string(dir.join(name)).unwrap_or_else(|_| default_for(name).to_string()) };

    let meta_raw = read("IDENTITY.md");
    Ok(Identity {
        personality: read("PERSONALITY.md"),
        user_facts: read("USER_FACTS.md"),
        meta: parse_identity_meta(&meta_raw),
        long_term_memory: read("LONG_TERM_MEMORY.md"),
        boot: read("BOOT.md"),
    })
}

fn parse_identity_meta(content: &str) -> IdentityMeta {
    let mut meta = IdentityMeta::default();
    for line in content.lines() {
        if let Some(v) = line.strip_prefix("name:") {
            meta.name = v.trim().to_string();
        } else if let Some(v) = line.strip_prefix("version:") {
            meta.version = v.trim().to_string();
        } else if let Some(v) = line.strip_prefix("description:") {
            meta.description = v.trim().to_string();
        }
    }
    meta
}

fn validate_file_name(name: &str) -> Result<(), String> {
    if IDENTITY_FILES.iter().any(|(f, _)| *f == name) {
        Ok(())
    } else {
        Err(format!("'{name}' is not a valid identity file name"))
    }
}
