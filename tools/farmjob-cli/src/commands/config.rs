//! Show the effective configuration, or write it out as a starting point.

use std::path::PathBuf;

use farmjob_common::config::{config_file_path, AppConfig};

pub fn run(init: bool, path: Option<PathBuf>, config: &AppConfig) -> anyhow::Result<()> {
    if !init {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    match path {
        Some(path) => {
            config
                .save_to(&path)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
            println!("Configuration written to {}", path.display());
        }
        None => {
            config
                .save()
                .map_err(|e| anyhow::anyhow!("Failed to write configuration: {e}"))?;
            println!("Configuration written to {}", config_file_path().display());
        }
    }
    Ok(())
}
