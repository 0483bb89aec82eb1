//! Configuration handling for the heatmap CLI
//!
//! Supports loading configuration from heatmap.toml files with CLI argument overrides.

use anyhow::{Context, Result};
use heatmap_core::{HeatmapConfig, MaxIntensity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CliError;

/// File looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "heatmap.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Visualization parameters handed to every overlay
    #[serde(default)]
    pub heatmap: HeatmapConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default number of threads to use
    #[serde(default = "default_threads")]
    pub threads: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for rendered tiles
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Tiles rendered on each side of the center tile by render-area
    #[serde(default = "default_span")]
    pub span: u32,
}

// Default value functions
fn default_threads() -> usize { num_cpus::get() }
fn default_directory() -> PathBuf { PathBuf::from("tiles") }
fn default_span() -> u32 { 1 }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            span: default_span(),
        }
    }
}

/// Per-invocation overrides of the `[heatmap]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleOverrides {
    pub radius: Option<u32>,
    pub opacity: Option<f64>,
    pub max_intensity: Option<MaxIntensity>,
    pub tile_size: Option<u32>,
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    log::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                    Self::load_from_file(&default_path)?
                } else {
                    log::info!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .map_err(CliError::from)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Overlay configuration after applying CLI overrides, validated.
    pub fn heatmap_config(&self, overrides: &StyleOverrides) -> Result<HeatmapConfig, CliError> {
        let mut heatmap = self.heatmap.clone();
        if let Some(radius) = overrides.radius {
            heatmap.radius = radius;
        }
        if let Some(opacity) = overrides.opacity {
            heatmap.opacity = opacity;
        }
        if let Some(max_intensity) = overrides.max_intensity {
            heatmap.max_intensity = max_intensity;
        }
        if let Some(tile_size) = overrides.tile_size {
            heatmap.tile_size = tile_size;
        }
        heatmap.validate()?;
        Ok(heatmap)
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }
}
