use anyhow::Result;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::color_utils::{colors, symbols};

/// Metadata sidecar written next to the diagnostic images of one input
#[derive(Serialize, Deserialize, Default, Debug)]
pub struct BeecountMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<CountSections>,
}

/// All sections for one counting run
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CountSections {
    // Core results are flattened into the [count] table
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub core: Option<toml::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<toml::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<InputProcessing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<BTreeMap<String, String>>,
}

/// Execution context for a tool invocation
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ExecutionContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beecount_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_line: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beecount_env_vars: Option<HashMap<String, String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct InputProcessing {
    pub image_path: String,
    pub width: u32,
    pub height: u32,
    pub strict_mode: bool,
}

/// Load existing metadata from a file, or create new empty metadata
pub fn load_or_create_metadata(path: &Path) -> Result<BeecountMetadata> {
    if !path.exists() {
        return Ok(BeecountMetadata::default());
    }

    let content = fs::read_to_string(path)?;
    match toml::from_str::<BeecountMetadata>(&content) {
        Ok(metadata) => Ok(metadata),
        Err(e) => {
            warn!(
                "{} Dropping existing metadata from {}:\n{}",
                symbols::warning(),
                path.display(),
                colors::warning_level(&e.to_string())
            );
            Ok(BeecountMetadata::default())
        }
    }
}

/// Save metadata to a file
pub fn save_metadata(metadata: &BeecountMetadata, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let toml_content = toml::to_string_pretty(metadata).map_err(|e| {
        log::debug!("About to serialize metadata: {metadata:#?}");
        anyhow::anyhow!("Failed to serialize metadata to TOML: {e}")
    })?;

    fs::write(path, toml_content)?;
    Ok(())
}

/// Metadata file path for an input image inside the resolved output directory
pub fn get_metadata_path(input_path: &Path, output_dir: &Path) -> Result<PathBuf> {
    let input_stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid input filename: {}", input_path.display()))?;

    Ok(output_dir.join(format!("{input_stem}.beecount.toml")))
}

/// Collect all BEECOUNT_* environment variables that are present and non-empty
pub fn collect_beecount_env_vars() -> Option<HashMap<String, String>> {
    let vars: HashMap<String, String> = std::env::vars()
        .filter(|(key, value)| key.starts_with("BEECOUNT_") && !value.is_empty())
        .collect();

    (!vars.is_empty()).then_some(vars)
}
