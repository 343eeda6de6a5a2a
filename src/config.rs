use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use log::info;

use crate::errors::{QuantError, Result};
use crate::scratch::default_scratch_dir;
use crate::segmentation::RenderMode;

/// Configuration for StainQuant
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub input_path: String,

    /// Export destination; nothing is exported when unset
    #[serde(default)]
    pub output_dir: Option<String>,

    /// Where rendered result images are kept during a run
    #[serde(default)]
    pub scratch_dir: Option<String>,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    #[serde(default)]
    pub render_mode: RenderMode,

    #[serde(default = "default_write_csv_summary")]
    pub write_csv_summary: bool,

    #[serde(default = "default_progress_channel_capacity")]
    pub progress_channel_capacity: usize,
}

/// What the batch runner does when one image cannot be quantified
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and carry on with the next image
    #[default]
    Skip,
    /// Stop the batch and return the error
    FailFast,
}

fn default_write_csv_summary() -> bool {
    false
}

fn default_progress_channel_capacity() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            output_dir: None,
            scratch_dir: None,
            failure_policy: FailurePolicy::default(),
            render_mode: RenderMode::default(),
            write_csv_summary: default_write_csv_summary(),
            progress_channel_capacity: default_progress_channel_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            QuantError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            QuantError::Config(format!("Failed to parse config file '{}': {}", path.display(), e))
        })
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            info!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            QuantError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration. The input folder itself is checked when a batch starts.
    pub fn validate(&self) -> Result<()> {
        if self.progress_channel_capacity == 0 {
            return Err(QuantError::Config(
                "progress_channel_capacity must be > 0".to_string(),
            ));
        }

        if let Some(output) = &self.output_dir {
            if output.trim().is_empty() {
                return Err(QuantError::Config("output_dir must not be empty".to_string()));
            }
            if Path::new(output).is_file() {
                return Err(QuantError::Config(format!("output_dir '{}' is a file", output)));
            }
        }

        Ok(())
    }

    pub fn scratch_path(&self) -> PathBuf {
        self.scratch_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(default_scratch_dir)
    }
}
