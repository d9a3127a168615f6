//! Batch driver chaining localisation, segmentation and output
//!
//! Items are processed strictly one at a time in the order the inputs yield
//! them. A crop window that falls outside its scan skips that item; every
//! other failure, including an existing output file, ends the run.

use crate::algorithm::localisation::{CropOutcome, LocalisationParams, crop_object};
use crate::algorithm::segmentation::{InferenceParams, segment_object_with_progress};
use crate::io::configuration::{IMAGE_OUTPUT_DIR, MASK_OUTPUT_DIR, OUTPUT_EXTENSION};
use crate::io::error::{PipelineError, Result, file_system_error};
use crate::io::inputs::InputItem;
use crate::io::progress::ProgressReporter;
use crate::io::volume_file::write_volume;
use crate::model::handle::{Locator, Segmenter};
use crate::spatial::CropOutOfBounds;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a run needs besides the networks
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Locator input size and crop window size
    pub localisation: LocalisationParams,
    /// Patch overlap and post-processing
    pub inference: InferenceParams,
    /// Root receiving the image and mask sub-directories
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    /// Check the configuration before any item is touched
    ///
    /// # Errors
    ///
    /// Returns a configuration error for inconsistent inference settings
    pub fn validate(&self) -> Result<()> {
        self.inference.validate()
    }
}

/// Where the two outputs of one item go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Cropped intensity volume
    pub image: PathBuf,
    /// Predicted mask
    pub mask: PathBuf,
}

impl OutputPaths {
    /// Fail if either output is already on disk
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::OutputExists`] naming the first existing path
    pub fn ensure_free(&self) -> Result<()> {
        for path in [&self.image, &self.mask] {
            if path.exists() {
                return Err(PipelineError::OutputExists { path: path.clone() });
            }
        }
        Ok(())
    }
}

/// What happened to one item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// Both outputs were written
    Saved(OutputPaths),
    /// The crop window did not fit; nothing was written
    Skipped(CropOutOfBounds),
}

/// An item left out of the run because its crop window did not fit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Source of the skipped volume
    pub identifier: PathBuf,
    /// Diagnostic detail from the localisation stage
    pub reason: CropOutOfBounds,
}

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Identifiers whose outputs were written, in processing order
    pub processed: Vec<PathBuf>,
    /// Items skipped because of a bad localisation
    pub skipped: Vec<SkippedItem>,
}

/// Localise, segment and save a stream of volumes
pub struct Pipeline {
    locator: Arc<dyn Locator>,
    segmenter: Arc<dyn Segmenter>,
    config: PipelineConfig,
    image_dir: PathBuf,
    mask_dir: PathBuf,
    progress: Option<ProgressReporter>,
}

impl Pipeline {
    /// Validate the configuration and create the output directories
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is inconsistent or the output
    /// directories cannot be created
    pub fn new(
        locator: Arc<dyn Locator>,
        segmenter: Arc<dyn Segmenter>,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;

        let image_dir = config.output_dir.join(IMAGE_OUTPUT_DIR);
        let mask_dir = config.output_dir.join(MASK_OUTPUT_DIR);
        for dir in [&image_dir, &mask_dir] {
            std::fs::create_dir_all(dir).map_err(file_system_error(dir, "create output directory"))?;
        }

        Ok(Self {
            locator,
            segmenter,
            config,
            image_dir,
            mask_dir,
            progress: None,
        })
    }

    /// Attach a progress display
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Configuration the pipeline runs with
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Output paths derived from an item's base name
    ///
    /// The extension of the base name is replaced, so `scan.dcm` and a slice
    /// directory called `scan` both end up as `scan.tif`.
    pub fn output_paths(&self, identifier: &Path) -> OutputPaths {
        let name = identifier.file_name().map_or(identifier.as_os_str(), |n| n);
        OutputPaths {
            image: self.image_dir.join(name).with_extension(OUTPUT_EXTENSION),
            mask: self.mask_dir.join(name).with_extension(OUTPUT_EXTENSION),
        }
    }

    /// Run one item through every stage
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::OutputExists`] before any network is called
    /// if an output is already present, or any error from the stages
    pub fn process_item(&self, item: &InputItem) -> Result<ItemOutcome> {
        let paths = self.output_paths(&item.identifier);
        paths.ensure_free()?;

        let cropped = match crop_object(
            self.locator.as_ref(),
            &item.volume,
            &self.config.localisation,
        )? {
            CropOutcome::Cropped(volume) => volume,
            CropOutcome::OutOfBounds(reason) => return Ok(ItemOutcome::Skipped(reason)),
        };

        let progress = self.progress.as_ref();
        let prediction = segment_object_with_progress(
            self.segmenter.as_ref(),
            &cropped,
            &self.config.inference,
            &mut |done, total| {
                if let Some(progress) = progress {
                    progress.update_patches(done, total);
                }
            },
        )?;

        let mask = prediction.to_volume()?;
        write_volume(&paths.image, &cropped)?;
        if let Err(error) = write_volume(&paths.mask, &mask) {
            // A lone image would block every rerun of this item
            if let Err(cleanup) = std::fs::remove_file(&paths.image) {
                log::warn!(
                    "Could not remove {} after a failed mask write: {cleanup}",
                    paths.image.display()
                );
            }
            return Err(error);
        }

        if let Some(foreground) = prediction.foreground_voxels() {
            log::debug!(
                "{}: {foreground} foreground voxels",
                item.identifier.display()
            );
        }
        Ok(ItemOutcome::Saved(paths))
    }

    /// Process every item the inputs yield
    ///
    /// # Errors
    ///
    /// Returns the first error other than an out-of-bounds crop; items
    /// already written stay on disk
    pub fn run<I>(&self, inputs: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<InputItem>>,
    {
        let mut summary = RunSummary::default();

        for item in inputs {
            let item = item?;
            if let Some(progress) = &self.progress {
                progress.start_item(&item.identifier);
            }

            match self.process_item(&item)? {
                ItemOutcome::Saved(paths) => {
                    log::info!(
                        "{} -> {}, {}",
                        item.identifier.display(),
                        paths.image.display(),
                        paths.mask.display()
                    );
                    summary.processed.push(item.identifier);
                }
                ItemOutcome::Skipped(reason) => {
                    log::warn!(
                        "Error cropping {}; likely an issue with the localising model: {reason}",
                        item.identifier.display()
                    );
                    summary.skipped.push(SkippedItem {
                        identifier: item.identifier,
                        reason,
                    });
                }
            }

            if let Some(progress) = &self.progress {
                progress.complete_item();
            }
        }

        if let Some(progress) = &self.progress {
            progress.finish();
        }
        Ok(summary)
    }
}
