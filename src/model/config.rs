//! Training configuration shipped alongside a segmentation network

use crate::io::error::{PipelineError, Result, file_system_error, invalid_parameter};
use crate::math::probability::Activation;
use serde::Deserialize;
use std::path::Path;

/// Settings a segmentation network must be run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SegmenterConfig {
    /// Patch extent the network was trained on (depth, height, width)
    pub patch_size: [usize; 3],
    /// Activation turning the network's logits into probabilities
    #[serde(default)]
    pub activation: Activation,
}

impl SegmenterConfig {
    /// Create a validated configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any patch extent is zero
    pub fn new(patch_size: [usize; 3], activation: Activation) -> Result<Self> {
        let config = Self {
            patch_size,
            activation,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| PipelineError::Configuration {
            reason: format!("segmentation config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration file next to a network
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(file_system_error(path, "read model config"))?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.patch_size.contains(&0) {
            return Err(invalid_parameter(
                "patch_size",
                &format!("{:?}", self.patch_size),
                &"every patch extent must be positive",
            ));
        }
        Ok(())
    }
}
