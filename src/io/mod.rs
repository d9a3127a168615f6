/// Command-line interface and top-level command
pub mod cli;
/// Named defaults and recognised file extensions
pub mod configuration;
/// Error types and result aliases
pub mod error;
/// Resolution of input descriptors into a stream of volumes
pub mod inputs;
/// Terminal progress display
pub mod progress;
/// Stacking of 2D slice directories
pub mod slices;
/// TIFF and DICOM volume files
pub mod volume_file;
