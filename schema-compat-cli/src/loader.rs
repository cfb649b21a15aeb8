use anyhow::{Context, Result};
use schema_compat::CheckerConfig;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "schema-compat.config.json";

/// Expands a leading `~` in a user-supplied path.
#[must_use]
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Reads a JSON or YAML document, chosen by file extension.
///
/// # Errors
/// Returns an error if the file cannot be read or does not parse.
pub fn load_document(path: &str) -> Result<Value> {
    let file_path = expand_path(path);
    let content = fs::read_to_string(&file_path)
        .with_context(|| format!("cannot read {}", file_path.display()))?;

    let extension = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let value: Value = match extension.as_str() {
        "yaml" | "yml" => serde_saphyr::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", file_path.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", file_path.display()))?,
    };
    Ok(value)
}

/// Checker configuration from `--config`, else the default config file in
/// the working directory, else built-in defaults.
#[must_use]
pub fn load_config(config_path: Option<&str>) -> CheckerConfig {
    if let Some(path) = config_path {
        match load_config_from_path(&expand_path(path)) {
            Ok(cfg) => return cfg,
            Err(e) => tracing::warn!("ignoring config {path}: {e:#}"),
        }
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        match load_config_from_path(default_path) {
            Ok(cfg) => return cfg,
            Err(e) => tracing::warn!("ignoring {DEFAULT_CONFIG_FILE}: {e:#}"),
        }
    }

    CheckerConfig::default()
}

fn load_config_from_path(path: &Path) -> Result<CheckerConfig> {
    let data = load_document(&path.to_string_lossy())?;
    Ok(CheckerConfig::from_value(data)?)
}
