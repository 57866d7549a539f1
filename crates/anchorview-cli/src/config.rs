//! Configuration loading

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Contents of `anchorview.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Used when `--log-level` is not given
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub bundle: BundleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Menu title shown at the top of the bundle page
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            bundle: BundleConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_title() -> String {
    "Menu".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("bundle")
}

impl Config {
    /// Load configuration, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("anchorview.toml")).unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.bundle.title, "Menu");
        assert_eq!(config.bundle.output_dir, PathBuf::from("bundle"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchorview.toml");
        std::fs::write(&path, "[bundle]\ntitle = \"Bistro\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.bundle.title, "Bistro");
        assert_eq!(config.bundle.output_dir, PathBuf::from("bundle"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchorview.toml");
        std::fs::write(&path, "log_level = [").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
