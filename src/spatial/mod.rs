//! Volumes and the geometry used to cut them
//!
//! This module contains:
//! - The immutable [`Volume`] type with native sample storage
//! - Crop windows and the out-of-bounds report produced when one does not fit

/// Volume storage, intensity scaling and cropping
pub mod volume;
/// Crop window construction and bounds validation
pub mod window;

pub use volume::{SampleType, Volume, VoxelData};
pub use window::{CropOutOfBounds, CropWindow};
