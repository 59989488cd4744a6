//! CLI command implementations.

pub mod check;
pub mod clean;

use std::fs;
use std::path::Path;

use refinery::ProcessorConfig;
use tracing::debug;

/// Read a JSON processor configuration, or the defaults without one.
pub fn load_config(path: Option<&Path>) -> Result<ProcessorConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(ProcessorConfig::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    let config: ProcessorConfig = serde_json::from_str(&text)?;
    debug!(path = %path.display(), ?config, "configuration loaded");
    Ok(config)
}
