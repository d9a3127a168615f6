//! Error types for input resolution, volume I/O, model handling and inference

use std::fmt;
use std::path::PathBuf;

/// Main error type for all pipeline operations
///
/// Crop windows falling outside the scan are not errors; they are reported as
/// [`CropOutcome::OutOfBounds`](crate::algorithm::localisation::CropOutcome).
#[derive(Debug)]
pub enum PipelineError {
    /// A path named by the input descriptor or a manifest does not exist
    InputNotFound {
        /// The missing path
        path: PathBuf,
    },

    /// A directory given as a 2D slice stack holds no slice files
    EmptySliceDirectory {
        /// Directory that was searched
        path: PathBuf,
    },

    /// A directory given as a batch of volumes holds no recognised volume files
    NoVolumeFiles {
        /// Directory that was searched
        path: PathBuf,
    },

    /// A regular file was supplied while 2D slice stacking was requested
    ///
    /// Usually a manifest mixing slice directories with volume files.
    SliceFlagWithFile {
        /// The offending regular file
        path: PathBuf,
    },

    /// A regular file whose extension is not a known volume format
    UnsupportedInput {
        /// The offending file
        path: PathBuf,
    },

    /// Loaded or stacked data does not have the dimensionality of a volume
    InvalidDimensions {
        /// Source of the data
        path: PathBuf,
        /// Shape that was found
        shape: Vec<usize>,
        /// What was expected instead
        reason: String,
    },

    /// Slices of one stack disagree in shape or sample type
    SliceMismatch {
        /// First slice that disagrees with its predecessors
        path: PathBuf,
        /// Description of the disagreement
        reason: String,
    },

    /// A volume was constructed with a zero-length axis
    EmptyVolume {
        /// The rejected shape
        shape: [usize; 3],
    },

    /// Failed to decode a volume file
    VolumeRead {
        /// Path to the volume file
        path: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Failed to encode a volume file
    VolumeWrite {
        /// Path where the write was attempted
        path: PathBuf,
        /// Encoder message
        reason: String,
    },

    /// Failed to load a 2D slice image
    ImageLoad {
        /// Path to the slice file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Inconsistent run configuration, detected before any item is processed
    Configuration {
        /// Explanation of the inconsistency
        reason: String,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// An output file for the current item already exists
    OutputExists {
        /// The existing file
        path: PathBuf,
    },

    /// Loading or running a network failed
    Model {
        /// Name of the model involved
        model: String,
        /// Description of the failure
        reason: String,
    },

    /// Internal invariant violation: an array came back with the wrong shape
    ShapeMismatch {
        /// Stage that produced the array
        operation: &'static str,
        /// Shape that was required
        expected: Vec<usize>,
        /// Shape that was produced
        actual: Vec<usize>,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputNotFound { path } => {
                write!(f, "Input '{}' does not exist", path.display())
            }
            Self::EmptySliceDirectory { path } => {
                write!(f, "No 2D slice files found in '{}'", path.display())
            }
            Self::NoVolumeFiles { path } => {
                write!(f, "No .tif or .dcm volume files found in '{}'", path.display())
            }
            Self::SliceFlagWithFile { path } => write!(
                f,
                "'{}' is a regular file but 2D slice stacking was requested; \
                 a manifest cannot mix slice directories with volume files",
                path.display()
            ),
            Self::UnsupportedInput { path } => {
                write!(f, "Cannot read '{}' as a volume", path.display())
            }
            Self::InvalidDimensions {
                path,
                shape,
                reason,
            } => write!(
                f,
                "'{}' has shape {shape:?}: {reason}",
                path.display()
            ),
            Self::SliceMismatch { path, reason } => {
                write!(f, "Slice '{}' cannot be stacked: {reason}", path.display())
            }
            Self::EmptyVolume { shape } => {
                write!(f, "Volume shape {shape:?} has an empty axis")
            }
            Self::VolumeRead { path, reason } => {
                write!(f, "Failed to read volume '{}': {reason}", path.display())
            }
            Self::VolumeWrite { path, reason } => {
                write!(f, "Failed to write volume '{}': {reason}", path.display())
            }
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => write!(
                f,
                "File system error during {operation} on '{}': {source}",
                path.display()
            ),
            Self::Configuration { reason } => write!(f, "Invalid configuration: {reason}"),
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::OutputExists { path } => {
                write!(f, "{} exists; move or delete it", path.display())
            }
            Self::Model { model, reason } => write!(f, "Model '{model}': {reason}"),
            Self::ShapeMismatch {
                operation,
                expected,
                actual,
            } => write!(
                f,
                "Shape mismatch in {operation}: expected {expected:?}, got {actual:?}"
            ),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for pipeline results
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> PipelineError {
    PipelineError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a configuration error
pub fn configuration_error(reason: &impl ToString) -> PipelineError {
    PipelineError::Configuration {
        reason: reason.to_string(),
    }
}

/// Create a model error
pub fn model_error(model: &str, reason: &impl ToString) -> PipelineError {
    PipelineError::Model {
        model: model.to_string(),
        reason: reason.to_string(),
    }
}

/// Wrap an I/O error with the path and operation it came from
pub fn file_system_error(
    path: impl Into<PathBuf>,
    operation: &'static str,
) -> impl FnOnce(std::io::Error) -> PipelineError {
    let path = path.into();
    move |source| PipelineError::FileSystem {
        path,
        operation,
        source,
    }
}
