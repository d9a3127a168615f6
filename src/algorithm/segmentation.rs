//! Sliding-window segmentation of a cropped volume
//!
//! The crop is scaled to the network's float range, cut into overlapping
//! patches of the size the network was trained on, and every patch output is
//! activated and accumulated. A voxel's score is the mean over all patches
//! covering it. Sums are kept in `f64` and patches are visited in raster
//! order, so identical input gives bit-identical output.

use crate::algorithm::patches::PatchGrid;
use crate::algorithm::postprocess::{PostProcessing, Prediction};
use crate::io::configuration::PATCH_OVERLAP;
use crate::io::error::{PipelineError, Result};
use crate::model::handle::Segmenter;
use crate::spatial::Volume;
use crate::spatial::volume::shape_of;
use ndarray::{Array3, ArrayView3, Zip, s};

/// Settings for one segmentation pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceParams {
    /// Overlap between neighbouring patches along every axis
    pub patch_overlap: [usize; 3],
    /// Thresholding and component selection applied to the blended scores
    pub postprocessing: PostProcessing,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            patch_overlap: PATCH_OVERLAP,
            postprocessing: PostProcessing::default(),
        }
    }
}

impl InferenceParams {
    /// Settings with the default patch overlap
    ///
    /// # Errors
    ///
    /// Returns a configuration error when component filtering is requested
    /// without a threshold
    pub fn new(threshold: Option<f32>, largest_component: bool) -> Result<Self> {
        Ok(Self {
            patch_overlap: PATCH_OVERLAP,
            postprocessing: PostProcessing::new(threshold, largest_component)?,
        })
    }

    /// Check the settings before any inference is run
    ///
    /// # Errors
    ///
    /// Returns an error if the post-processing settings are inconsistent
    pub fn validate(&self) -> Result<()> {
        self.postprocessing.validate()
    }
}

/// Segment a cropped volume
///
/// # Errors
///
/// Returns an error if the settings are inconsistent (checked before the
/// network is called), the network fails, or an output has the wrong shape
pub fn segment_object(
    segmenter: &dyn Segmenter,
    volume: &Volume,
    params: &InferenceParams,
) -> Result<Prediction> {
    segment_object_with_progress(segmenter, volume, params, &mut |_, _| {})
}

/// Segment a cropped volume, reporting `(patches done, patch count)` after every patch
///
/// # Errors
///
/// Same as [`segment_object`]
pub fn segment_object_with_progress(
    segmenter: &dyn Segmenter,
    volume: &Volume,
    params: &InferenceParams,
    on_patch: &mut dyn FnMut(usize, usize),
) -> Result<Prediction> {
    params.validate()?;

    let scaled = volume.to_unit_f32();
    let scores = predict_scores(segmenter, scaled.view(), params.patch_overlap, on_patch)?;

    let expected = volume.shape();
    let actual = shape_of(&scores);
    if actual != expected {
        return Err(PipelineError::ShapeMismatch {
            operation: "segmentation",
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }

    params.postprocessing.apply(scores)
}

/// Blended foreground probabilities for an intensity-scaled volume
///
/// # Errors
///
/// Returns an error if the patch layout is invalid, the network fails, or a
/// patch output does not match the patch extent
pub fn predict_scores(
    segmenter: &dyn Segmenter,
    volume: ArrayView3<'_, f32>,
    overlap: [usize; 3],
    on_patch: &mut dyn FnMut(usize, usize),
) -> Result<Array3<f32>> {
    let config = segmenter.config();
    let (d, h, w) = volume.dim();
    let grid = PatchGrid::new([d, h, w], config.patch_size, overlap)?;
    let padded_shape = grid.padded_shape();
    log::debug!(
        "Segmenting {:?} with {} patches of {:?}",
        [d, h, w],
        grid.len(),
        config.patch_size
    );

    let padded = if padded_shape == [d, h, w] {
        volume.to_owned()
    } else {
        let mut padded = Array3::zeros(padded_shape);
        padded.slice_mut(s![..d, ..h, ..w]).assign(&volume);
        padded
    };

    let mut sums = Array3::<f64>::zeros(padded_shape);
    let mut counts = Array3::<u32>::zeros(padded_shape);
    let total = grid.len();

    for (index, origin) in grid.origins().enumerate() {
        let [z, y, x] = grid.region(origin);
        let patch = padded.slice(s![z.clone(), y.clone(), x.clone()]);

        let logits = segmenter.predict_patch(patch)?;
        let scores = config.activation.apply(logits)?;
        if shape_of(&scores) != config.patch_size {
            return Err(PipelineError::ShapeMismatch {
                operation: "patch prediction",
                expected: config.patch_size.to_vec(),
                actual: shape_of(&scores).to_vec(),
            });
        }

        Zip::from(sums.slice_mut(s![z.clone(), y.clone(), x.clone()]))
            .and(counts.slice_mut(s![z, y, x]))
            .and(&scores)
            .for_each(|sum, count, &score| {
                *sum += f64::from(score);
                *count += 1;
            });

        on_patch(index + 1, total);
    }

    let blended = Zip::from(&sums)
        .and(&counts)
        .map_collect(|&sum, &count| {
            if count == 0 {
                0.0
            } else {
                (sum / f64::from(count)) as f32
            }
        });

    Ok(blended.slice(s![..d, ..h, ..w]).to_owned())
}
