//! Numerical helpers shared by the localisation and segmentation stages

/// Trilinear resampling between voxel grids
pub mod interpolation;
/// Output activations turning network logits into probabilities
pub mod probability;
