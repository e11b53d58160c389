//! Layered configuration loading.
//!
//! Sources, lowest priority first: built-in defaults, the user config file
//! (`config.yaml` in the platform config dir), the project's
//! `.codepecker.yaml`, then `CODEPECKER_*` environment variables. CLI flags
//! are applied by the binary on top of the result.
//!
//! YAML layers are deep-merged as documents before deserializing, so a file
//! only needs the keys it overrides.

pub mod schema;

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::{CallGraphError, Result};

pub use schema::{BackendKind, CodepeckerConfig, DatabaseConfig, IngestConfig, QueryConfig};

pub const PROJECT_CONFIG_FILE: &str = ".codepecker.yaml";
pub const ENV_DB_BACKEND: &str = "CODEPECKER_DB_BACKEND";
pub const ENV_DB_PATH: &str = "CODEPECKER_DB_PATH";
pub const ENV_WORKERS: &str = "CODEPECKER_WORKERS";

/// `<config dir>/codepecker/config.yaml`, when the platform has one.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "codepecker")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
}

/// Load the effective configuration for `project_root` from the real
/// user config dir and process environment.
pub fn load(project_root: &Path) -> Result<CodepeckerConfig> {
    load_from(user_config_path().as_deref(), project_root, |key| {
        std::env::var(key).ok()
    })
}

/// [`load`] with the user file and environment supplied by the caller.
pub fn load_from(
    user_file: Option<&Path>,
    project_root: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<CodepeckerConfig> {
    let mut merged = Value::Mapping(Default::default());

    let project_file = project_root.join(PROJECT_CONFIG_FILE);
    for path in user_file.into_iter().chain(std::iter::once(project_file.as_path())) {
        if let Some(layer) = read_layer(path)? {
            tracing::debug!(path = %path.display(), "config layer loaded");
            merge(&mut merged, layer);
        }
    }

    let mut config: CodepeckerConfig = serde_yaml::from_value(merged)?;
    apply_env(&mut config, env)?;
    Ok(config.clamp())
}

fn read_layer(path: &Path) -> Result<Option<Value>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let value: Value = serde_yaml::from_str(&text)
        .map_err(|e| CallGraphError::Config(format!("{}: {e}", path.display())))?;
    Ok(match value {
        Value::Null => None,
        other => Some(other),
    })
}

/// Overlay `layer` onto `base`; mappings merge key by key, anything else
/// replaces.
fn merge(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Mapping(base_map), Value::Mapping(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn apply_env(config: &mut CodepeckerConfig, env: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(raw) = env(ENV_DB_BACKEND) {
        config.database.backend = BackendKind::from_str_loose(&raw)
            .ok_or_else(|| CallGraphError::Config(format!("{ENV_DB_BACKEND}: unknown backend {raw:?}")))?;
    }
    if let Some(raw) = env(ENV_DB_PATH) {
        if !raw.trim().is_empty() {
            config.database.path = raw;
        }
    }
    if let Some(raw) = env(ENV_WORKERS) {
        config.ingest.workers = raw
            .trim()
            .parse()
            .map_err(|_| CallGraphError::Config(format!("{ENV_WORKERS}: not a number: {raw:?}")))?;
    }
    Ok(())
}
