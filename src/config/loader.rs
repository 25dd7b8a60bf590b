//! TOML configuration loading, env-var overrides, and atomic saves.
//!
//! # Loading order
//! 1. Parse `~/.clawpoint/config.toml` (or the path in `CLAWPOINT_CONFIG`).
//! 2. Apply `CLAWPOINT_*` environment variable overrides.
//! 3. Fall back to [`GatewayConfig::default()`] if the file is missing.
//!
//! # Atomic save
//! Writes to `<path>.tmp`, backs up any existing file to `<path>.bak`, then
//! renames the temp file into place.

use std::{env, fs, path::{Path, PathBuf}};

use super::schema::GatewayConfig;
use crate::error::ConfigError;

/// The default config file path: `~/.clawpoint/config.toml`.
pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::home_dir().map(|h| h.join(".clawpoint").join("config.toml")).ok_or_else(|| "could not determine home directory".to_string())
}

/// Loads [`GatewayConfig`] from `path`, falling back to defaults if the file
/// does not exist, then applying environment variable overrides.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let mut config = match fs::read_to_string(path) {
        Ok(content) => toml::from_str::<GatewayConfig>(&content).map_err(|e| ConfigError::Parse { path: path.display().to_string(), source: e })?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => GatewayConfig::default(),
        Err(e) => return Err(ConfigError::Read { path: path.display().to_string(), source: e }),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Loads config from `CLAWPOINT_CONFIG`, or the default path if unset,
/// falling back to [`GatewayConfig::default()`] on any error.
pub fn load_default_config() -> GatewayConfig {
    let path = env::var("CLAWPOINT_CONFIG").map(PathBuf::from).unwrap_or_else(|_| default_config_path().unwrap_or_else(|_| PathBuf::from("config.toml")));
    load_config(&path).unwrap_or_default()
}

/// Applies `CLAWPOINT_*` environment variable overrides to `config`
/// (SPEC_FULL.md's ambient-stack section names exactly these two).
fn apply_env_overrides(config: &mut GatewayConfig) {
    if let Ok(v) = env::var("CLAWPOINT_DEFAULT_MODEL") {
        config.default_model = v;
    }
    if let Ok(v) = env::var("CLAWPOINT_WORKSPACE_ROOT") {
        config.workspace_root = Some(v);
    }
}

/// Atomically saves `config` to `path`: writes to `<path>.tmp`, backs up any
/// existing file to `<path>.bak`, then renames the temp file into place.
pub fn save_config(path: &Path, config: &GatewayConfig) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, &content)?;

    if path.exists() {
        let bak_path = path.with_extension("toml.bak");
        fs::copy(path, &bak_path)?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}
