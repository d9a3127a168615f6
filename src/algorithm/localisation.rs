//! Locate the structure of interest and cut a fixed-size window around it
//!
//! The locator network sees a downsampled copy of the scan. Its prediction is
//! scaled back to full resolution per axis and a window of the requested size
//! is taken around it. Windows that would cross the scan boundary are not
//! clipped; they come back as [`CropOutcome::OutOfBounds`] so one bad
//! prediction costs one item rather than the batch.

use crate::io::error::{Result, invalid_parameter, model_error};
use crate::math::interpolation::resize_trilinear;
use crate::model::handle::Locator;
use crate::spatial::{CropOutOfBounds, CropWindow, Volume};

/// Sizes used by the localisation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalisationParams {
    /// Volume size the locator network expects (depth, height, width)
    pub locator_input_size: [usize; 3],
    /// Size of the window cut around the predicted centre
    pub window_size: [usize; 3],
}

impl LocalisationParams {
    /// Create validated localisation sizes
    ///
    /// # Errors
    ///
    /// Returns an error if any extent is zero
    pub fn new(locator_input_size: [usize; 3], window_size: [usize; 3]) -> Result<Self> {
        if locator_input_size.contains(&0) {
            return Err(invalid_parameter(
                "locator_input_size",
                &format!("{locator_input_size:?}"),
                &"every axis needs at least one voxel",
            ));
        }
        if window_size.contains(&0) {
            return Err(invalid_parameter(
                "window_size",
                &format!("{window_size:?}"),
                &"every axis needs at least one voxel",
            ));
        }
        Ok(Self {
            locator_input_size,
            window_size,
        })
    }
}

/// Result of cropping one scan
///
/// Errors of any other kind travel in the surrounding `Result`.
#[derive(Debug, Clone, PartialEq)]
pub enum CropOutcome {
    /// The window fitted; holds the cropped volume
    Cropped(Volume),
    /// The window crossed the scan boundary
    OutOfBounds(CropOutOfBounds),
}

/// Scale a centre predicted in downsampled space back to full resolution
///
/// Each axis is multiplied by `full / downsampled` and rounded to the
/// nearest voxel.
pub fn map_to_full_resolution(
    predicted: [f64; 3],
    downsampled: [usize; 3],
    full: [usize; 3],
) -> [i64; 3] {
    let mut centre = [0i64; 3];
    for (value, ((&p, &d), &f)) in centre
        .iter_mut()
        .zip(predicted.iter().zip(&downsampled).zip(&full))
    {
        *value = (p * (f as f64 / d as f64)).round() as i64;
    }
    centre
}

/// Predict the full-resolution centre of the structure in `volume`
///
/// Inference happens on whatever device the locator lives on.
///
/// # Errors
///
/// Returns an error if resampling or inference fails, or the network
/// predicts a non-finite coordinate
pub fn locate_centre(
    locator: &dyn Locator,
    volume: &Volume,
    locator_input_size: [usize; 3],
) -> Result<[i64; 3]> {
    let downsampled = resize_trilinear(volume.to_unit_f32().view(), locator_input_size)?;
    let predicted = locator.locate(downsampled.view())?;

    if predicted.iter().any(|v| !v.is_finite()) {
        return Err(model_error(
            "locator",
            &format!("predicted non-finite centre {predicted:?}"),
        ));
    }

    let centre = map_to_full_resolution(predicted, locator_input_size, volume.shape());
    log::debug!(
        "Locator predicted {predicted:?} in {locator_input_size:?}, centre {centre:?} in {:?}",
        volume.shape()
    );
    Ok(centre)
}

/// Crop the region of interest from a full-resolution scan
///
/// # Errors
///
/// Returns an error if localisation fails; a window outside the scan is
/// reported as [`CropOutcome::OutOfBounds`] instead
pub fn crop_object(
    locator: &dyn Locator,
    volume: &Volume,
    params: &LocalisationParams,
) -> Result<CropOutcome> {
    let centre = locate_centre(locator, volume, params.locator_input_size)?;

    match CropWindow::centred(centre, params.window_size, volume.shape()) {
        Ok(window) => volume.crop(&window).map(CropOutcome::Cropped),
        Err(out_of_bounds) => Ok(CropOutcome::OutOfBounds(out_of_bounds)),
    }
}
