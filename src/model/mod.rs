//! Network handles and the registry that keeps them loaded

/// Registry of loaded networks keyed by name and device
pub mod cache;
/// Training configuration bundled with segmentation networks
pub mod config;
/// Traits the pipeline uses to talk to networks
pub mod handle;
/// ONNX Runtime backend
#[cfg(feature = "onnx")]
pub mod onnx;

pub use cache::{CacheStats, ModelCache, ModelKey};
pub use config::SegmenterConfig;
pub use handle::{Device, Locator, MissingBackend, ModelLoader, Segmenter};
