//! Two-stage localisation and segmentation of structures in 3D micro-CT scans
//!
//! A locator network predicts where the structure sits in a downsampled copy
//! of each scan; a fixed-size window is cropped around that point at full
//! resolution and a segmentation network is run over it patch by patch. The
//! blended scores are thresholded and reduced to their largest connected
//! component before the crop and its mask are written side by side.

/// Connected components, localisation, patch-wise segmentation and the batch driver
pub mod algorithm;
/// Input resolution, volume files, configuration and error handling
pub mod io;
/// Resampling and output activations
pub mod math;
/// Network handles, their configuration and the loaded-model registry
pub mod model;
/// Volumes and crop windows
pub mod spatial;

pub use io::error::{PipelineError, Result};
