//! YAML loading and saving for waveform options

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::options::WaveformOptions;
use crate::error::ConfigError;

/// Default options file location
///
/// Returns: `~/.config/wavesight/options.yaml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("wavesight")
        .join("options.yaml")
}

/// Load options from a YAML file
///
/// A missing file yields defaults. A file that fails to parse or holds
/// out-of-range values is logged and replaced by defaults.
pub fn load_options(path: &Path) -> WaveformOptions {
    log::info!("load_options: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_options: Options file doesn't exist, using defaults");
        return WaveformOptions::default();
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::warn!("load_options: Failed to read options file: {}, using defaults", e);
            return WaveformOptions::default();
        }
    };

    match parse_options(&contents) {
        Ok(options) => {
            log::info!("load_options: Successfully loaded options from {:?}", path);
            options
        }
        Err(e) => {
            log::warn!("load_options: {}, using defaults", e);
            WaveformOptions::default()
        }
    }
}

/// Parse and validate options from YAML text
pub fn parse_options(yaml: &str) -> Result<WaveformOptions, ConfigError> {
    let options: WaveformOptions =
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
    options.validate()?;
    Ok(options)
}

/// Save options to a YAML file, creating parent directories
pub fn save_options(options: &WaveformOptions, path: &Path) -> Result<()> {
    log::info!("save_options: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create options directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(options).context("Failed to serialize options to YAML")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write options file: {:?}", path))?;

    Ok(())
}
