/// Connected-component labelling and largest-component selection
pub mod components;
/// Locator-driven cropping of the region of interest
pub mod localisation;
/// Sliding-window patch layout
pub mod patches;
/// Batch driver sequencing every stage and writing outputs
pub mod pipeline;
/// Thresholding and component filtering of blended scores
pub mod postprocess;
/// Patch-wise segmentation with overlap blending
pub mod segmentation;
