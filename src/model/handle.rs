//! Narrow interfaces to the localisation and segmentation networks
//!
//! Network architecture, weights and the runtime executing them live behind
//! these traits. Handles are immutable once constructed and shared through
//! `Arc`, so every method takes `&self`; backends that need exclusive access
//! to their runtime guard it internally.

use crate::io::error::{Result, model_error};
use crate::model::config::SegmenterConfig;
use clap::ValueEnum;
use ndarray::{Array4, ArrayView3};
use std::fmt;
use std::sync::Arc;

/// Compute device a network is loaded onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Device {
    /// Host CPU
    #[default]
    Cpu,
    /// First CUDA accelerator
    Cuda,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda => f.write_str("cuda"),
        }
    }
}

/// Network predicting the centre of the structure of interest
pub trait Locator: Send + Sync {
    /// Predict the centre of the structure in a downsampled, intensity-scaled volume
    ///
    /// The result is in the voxel coordinates of `volume`, ordered
    /// (depth, height, width).
    ///
    /// # Errors
    ///
    /// Returns an error if the network cannot be run on the input
    fn locate(&self, volume: ArrayView3<'_, f32>) -> Result<[f64; 3]>;
}

/// Network producing per-voxel logits for one patch
pub trait Segmenter: Send + Sync {
    /// Training configuration the network was shipped with
    fn config(&self) -> &SegmenterConfig;

    /// Run the network on one intensity-scaled patch
    ///
    /// Returns raw logits shaped `(channels, depth, height, width)` with the
    /// spatial extent of `patch`. The activation named in
    /// [`Segmenter::config`] is applied by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the network cannot be run on the input
    fn predict_patch(&self, patch: ArrayView3<'_, f32>) -> Result<Array4<f32>>;
}

/// Constructs network handles from their names
///
/// Loading is expensive; callers go through
/// [`ModelCache`](crate::model::cache::ModelCache) rather than calling this directly.
pub trait ModelLoader {
    /// Load the localisation network `name` in evaluation mode
    ///
    /// # Errors
    ///
    /// Returns an error if the network or its weights cannot be loaded
    fn load_locator(&self, name: &str, device: Device) -> Result<Arc<dyn Locator>>;

    /// Load the segmentation bundle `name`, including its training configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the bundle cannot be loaded
    fn load_segmenter(&self, name: &str, device: Device) -> Result<Arc<dyn Segmenter>>;
}

/// Loader used when the crate is built without a network runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingBackend;

const MISSING_BACKEND: &str =
    "no network runtime compiled in; rebuild with `--features onnx` to load models";

impl ModelLoader for MissingBackend {
    fn load_locator(&self, name: &str, _device: Device) -> Result<Arc<dyn Locator>> {
        Err(model_error(name, &MISSING_BACKEND))
    }

    fn load_segmenter(&self, name: &str, _device: Device) -> Result<Arc<dyn Segmenter>> {
        Err(model_error(name, &MISSING_BACKEND))
    }
}
