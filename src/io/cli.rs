//! Command-line interface for cropping and segmenting a batch of CT scans

use crate::algorithm::localisation::LocalisationParams;
use crate::algorithm::pipeline::{Pipeline, PipelineConfig, RunSummary};
use crate::algorithm::segmentation::InferenceParams;
use crate::io::configuration::{
    DEFAULT_CROP_SIZE, DEFAULT_DOWNSAMPLED_INPUT_SIZE, DEFAULT_MODEL_DIR, DEFAULT_OUTPUT_DIR,
    DEFAULT_THRESHOLD,
};
use crate::io::error::{Result, configuration_error};
use crate::io::inputs::InferenceInputs;
use crate::io::progress::ProgressReporter;
use crate::model::cache::ModelCache;
use crate::model::handle::{Device, ModelLoader};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jawseg")]
#[command(
    author,
    version,
    about = "Locate, crop and segment a structure in 3D micro-CT scans",
    long_about = "Locate, crop and segment a structure in 3D micro-CT scans.\n\n\
        INPUT_DATA can be a 3D .tif or .dcm file, a directory of them, a directory \
        of 2D .tif slices (with --two-d-images), or a .txt manifest listing any of \
        these one per line. Manifest lines that are empty or start with # are ignored. \
        A manifest cannot mix slice directories with volume files."
)]
/// Command-line arguments for the inference pipeline
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Name of the model used for the initial crop
    pub locator_model: String,

    /// Name of the model used for the segmentation
    pub segmentation_model: String,

    /// Volume file, directory or manifest to run the pipeline on
    #[arg(value_name = "INPUT_DATA")]
    pub input_data: PathBuf,

    /// Directories hold 2D slices to be stacked into one volume each
    #[arg(long)]
    pub two_d_images: bool,

    /// Side length in voxels of the cubic region cropped around the predicted centre
    #[arg(long, default_value_t = DEFAULT_CROP_SIZE)]
    pub crop_size: usize,

    /// Size (depth height width) the locator model downsamples its input to
    #[arg(long, num_args = 1.., value_name = "SIZE", default_values_t = DEFAULT_DOWNSAMPLED_INPUT_SIZE)]
    pub downsampled_input_size: Vec<usize>,

    /// Device to run both models on
    #[arg(short, long, value_enum, default_value_t = Device::Cpu)]
    pub device: Device,

    /// Directory receiving the imgs/ and masks/ sub-directories; created if missing
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Directory holding the model files
    #[arg(long, default_value = DEFAULT_MODEL_DIR)]
    pub model_dir: PathBuf,

    /// Score above which a voxel is foreground
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f32,

    /// Write blended scores instead of a binary mask (requires --no-largest-component)
    #[arg(long)]
    pub no_threshold: bool,

    /// Keep every connected component of the mask
    #[arg(long)]
    pub no_largest_component: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }

    /// Threshold to apply, if any
    pub const fn threshold(&self) -> Option<f32> {
        if self.no_threshold {
            None
        } else {
            Some(self.threshold)
        }
    }

    /// Build and validate the pipeline configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the downsampled size does not have
    /// exactly three values, a size is zero, or largest-component filtering
    /// is requested without a threshold
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let &[depth, height, width] = self.downsampled_input_size.as_slice() else {
            return Err(configuration_error(&format!(
                "must have a 3D downsampled input size, got {:?}",
                self.downsampled_input_size
            )));
        };
        let locator_input_size = [depth, height, width];

        let config = PipelineConfig {
            localisation: LocalisationParams::new(locator_input_size, [self.crop_size; 3])?,
            inference: InferenceParams::new(self.threshold(), !self.no_largest_component)?,
            output_dir: self.output_dir.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Runs the whole pipeline for one invocation
pub struct InferenceCommand {
    cli: Cli,
}

impl InferenceCommand {
    /// Create a command from parsed arguments
    pub const fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Arguments the command was created with
    pub const fn cli(&self) -> &Cli {
        &self.cli
    }

    /// Run with the network backend compiled into this build
    ///
    /// # Errors
    ///
    /// Returns the first error other than an out-of-bounds crop
    pub fn run(&self) -> Result<RunSummary> {
        #[cfg(feature = "onnx")]
        let loader = crate::model::onnx::OnnxModelLoader::new(&self.cli.model_dir);
        #[cfg(not(feature = "onnx"))]
        let loader = crate::model::handle::MissingBackend;

        self.run_with_loader(loader)
    }

    /// Run with networks from `loader`
    ///
    /// The configuration and top-level input are checked before any network
    /// is loaded.
    ///
    /// # Errors
    ///
    /// Returns the first error other than an out-of-bounds crop
    pub fn run_with_loader<L: ModelLoader>(&self, loader: L) -> Result<RunSummary> {
        let config = self.cli.pipeline_config()?;
        let inputs = InferenceInputs::new(&self.cli.input_data, self.cli.two_d_images)?;

        let models = ModelCache::new(loader);
        let locator = models.get_or_load_locator(&self.cli.locator_model, self.cli.device)?;
        let segmenter = models.get_or_load_segmenter(&self.cli.segmentation_model, self.cli.device)?;

        let mut pipeline = Pipeline::new(locator, segmenter, config)?;
        if self.cli.should_show_progress() {
            pipeline = pipeline.with_progress(ProgressReporter::new());
        }

        let summary = pipeline.run(inputs)?;
        log::info!(
            "Processed {} volumes, skipped {}; outputs in {}",
            summary.processed.len(),
            summary.skipped.len(),
            self.cli.output_dir.display()
        );
        for skipped in &summary.skipped {
            log::info!("Skipped {}: {}", skipped.identifier.display(), skipped.reason);
        }
        Ok(summary)
    }
}
