//! Turning continuous scores into the mask that gets written
//!
//! Thresholding and component selection are separate policies. Both are
//! optional, but component selection only makes sense on a binary mask.

use crate::algorithm::components::{Connectivity, largest_connected_component};
use crate::io::error::{Result, configuration_error, invalid_parameter};
use crate::spatial::volume::shape_of;
use crate::spatial::Volume;
use ndarray::Array3;

/// Post-processing applied to the blended scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessing {
    /// Scores strictly above this value are foreground; `None` keeps scores
    pub threshold: Option<f32>,
    /// Keep only the largest connected foreground component
    pub largest_component: bool,
    /// Adjacency used when extracting components
    pub connectivity: Connectivity,
}

impl Default for PostProcessing {
    fn default() -> Self {
        Self {
            threshold: Some(crate::io::configuration::DEFAULT_THRESHOLD),
            largest_component: true,
            connectivity: Connectivity::default(),
        }
    }
}

impl PostProcessing {
    /// Create validated post-processing settings with full connectivity
    ///
    /// # Errors
    ///
    /// Returns a configuration error when component filtering is requested
    /// without a threshold, or an invalid parameter error for a NaN threshold
    pub fn new(threshold: Option<f32>, largest_component: bool) -> Result<Self> {
        let settings = Self {
            threshold,
            largest_component,
            connectivity: Connectivity::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Same settings with a different adjacency rule
    #[must_use]
    pub const fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Check the settings can be applied
    ///
    /// # Errors
    ///
    /// Returns a configuration error when component filtering is requested
    /// without a threshold, or an invalid parameter error for a NaN threshold
    pub fn validate(&self) -> Result<()> {
        if self.largest_component && self.threshold.is_none() {
            return Err(configuration_error(
                &"largest-component filtering needs a threshold to binarise the scores first",
            ));
        }
        if let Some(threshold) = self.threshold {
            if threshold.is_nan() {
                return Err(invalid_parameter(
                    "threshold",
                    &threshold,
                    &"must be a number",
                ));
            }
        }
        Ok(())
    }

    /// Apply thresholding and component selection to `scores`
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid
    pub fn apply(&self, scores: Array3<f32>) -> Result<Prediction> {
        self.validate()?;

        let Some(threshold) = self.threshold else {
            return Ok(Prediction::Scores(scores));
        };

        let mask = binarise(&scores, threshold);
        if self.largest_component {
            Ok(Prediction::Mask(largest_connected_component(
                mask.view(),
                self.connectivity,
            )))
        } else {
            Ok(Prediction::Mask(mask))
        }
    }
}

/// Segmentation result for one cropped volume
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// Blended per-voxel scores, kept when no threshold was given
    Scores(Array3<f32>),
    /// Binary foreground mask
    Mask(Array3<bool>),
}

impl Prediction {
    /// Shape as (depth, height, width)
    pub fn shape(&self) -> [usize; 3] {
        match self {
            Self::Scores(scores) => shape_of(scores),
            Self::Mask(mask) => shape_of(mask),
        }
    }

    /// Number of foreground voxels, if this is a mask
    pub fn foreground_voxels(&self) -> Option<usize> {
        match self {
            Self::Scores(_) => None,
            Self::Mask(mask) => Some(mask.iter().filter(|&&v| v).count()),
        }
    }

    /// Volume to persist: masks as `u8` 0/1, scores as `f32`
    ///
    /// # Errors
    ///
    /// Returns an error if the prediction has an empty axis
    pub fn to_volume(&self) -> Result<Volume> {
        match self {
            Self::Scores(scores) => Volume::new(scores.clone()),
            Self::Mask(mask) => Volume::new(mask.mapv(u8::from)),
        }
    }
}

/// Foreground wherever the score is strictly above `threshold`
pub fn binarise(scores: &Array3<f32>, threshold: f32) -> Array3<bool> {
    scores.mapv(|score| score > threshold)
}
