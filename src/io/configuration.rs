//! Pipeline constants and runtime configuration defaults

// Localisation defaults
/// Side length of the cubic crop window around the predicted centre
pub const DEFAULT_CROP_SIZE: usize = 192;
/// Size the locator network was trained on (depth, height, width)
pub const DEFAULT_DOWNSAMPLED_INPUT_SIZE: [usize; 3] = [512, 128, 128];

// Segmentation defaults
/// Overlap between neighbouring patches along every axis
///
/// Not part of the bundle configuration; the networks were trained with this value.
pub const PATCH_OVERLAP: [usize; 3] = [4, 4, 4];
/// Score above which a voxel counts as foreground
pub const DEFAULT_THRESHOLD: f32 = 0.5;

// Input recognition
/// Extension marking a manifest listing one input per line
pub const MANIFEST_EXTENSION: &str = "txt";
/// Lines of a manifest starting with this prefix are ignored
pub const MANIFEST_COMMENT_PREFIX: char = '#';
/// Extensions of 2D slice images stacked into a volume
pub const SLICE_EXTENSIONS: [&str; 2] = ["tif", "tiff"];
/// Extensions of 3D TIFF volumes
pub const TIFF_EXTENSIONS: [&str; 2] = ["tif", "tiff"];
/// Extension of DICOM volumes
pub const DICOM_EXTENSION: &str = "dcm";

// Model bundles
/// Directory searched for model files when none is given
pub const DEFAULT_MODEL_DIR: &str = "models";
/// Extension of serialised networks
pub const MODEL_EXTENSION: &str = "onnx";
/// Extension of the training configuration shipped next to a segmentation network
pub const MODEL_CONFIG_EXTENSION: &str = "json";

// Output settings
/// Directory that receives the output sub-directories when none is given
pub const DEFAULT_OUTPUT_DIR: &str = "inference_output";
/// Sub-directory holding cropped intensity volumes
pub const IMAGE_OUTPUT_DIR: &str = "imgs";
/// Sub-directory holding predicted masks
pub const MASK_OUTPUT_DIR: &str = "masks";
/// Extension given to every output volume
pub const OUTPUT_EXTENSION: &str = "tif";

// Progress bar display settings
/// Width of the patch progress bar in characters
pub const PROGRESS_BAR_WIDTH: u16 = 30;
/// Interval between spinner redraws in milliseconds
pub const SPINNER_TICK_MS: u64 = 120;
