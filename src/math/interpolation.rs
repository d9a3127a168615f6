//! Trilinear resampling for moving volumes between voxel grids
//!
//! Sample positions follow the half-voxel-centre convention: output voxel `i`
//! of an axis of length `n` reads input position `(i + 0.5) * m / n - 0.5`,
//! clamped to the first and last input voxel. Resampling to the same size is
//! the exact identity.

use crate::io::error::{Result, invalid_parameter};
use ndarray::{Array3, ArrayView3, Axis};

/// Where one output voxel reads from along a single axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSample {
    /// Input index at or below the sample position
    pub lower: usize,
    /// Input index above the sample position (equal to `lower` at the edge)
    pub upper: usize,
    /// Fractional distance from `lower` towards `upper`
    pub weight: f32,
}

/// Compute the sample positions for resizing one axis from `source` to `target` voxels
pub fn axis_samples(source: usize, target: usize) -> Vec<AxisSample> {
    let last = source.saturating_sub(1);
    let scale = source as f64 / target as f64;

    (0..target)
        .map(|i| {
            let position = ((i as f64 + 0.5) * scale - 0.5).clamp(0.0, last as f64);
            let lower = (position.floor() as usize).min(last);
            let upper = (lower + 1).min(last);
            AxisSample {
                lower,
                upper,
                weight: (position - lower as f64) as f32,
            }
        })
        .collect()
}

/// Resize a volume to `target` voxels per axis with trilinear interpolation
///
/// Interpolation is applied one axis at a time, which is equivalent to the
/// eight-neighbour formulation and keeps every pass a simple lane walk.
///
/// # Errors
///
/// Returns an error if any target extent is zero or the input is empty
pub fn resize_trilinear(input: ArrayView3<'_, f32>, target: [usize; 3]) -> Result<Array3<f32>> {
    if target.contains(&0) {
        return Err(invalid_parameter(
            "target",
            &format!("{target:?}"),
            &"every axis needs at least one voxel",
        ));
    }
    if input.is_empty() {
        return Err(invalid_parameter(
            "input",
            &format!("{:?}", input.shape()),
            &"cannot resample an empty volume",
        ));
    }

    let mut current = input.to_owned();
    for (axis, &length) in target.iter().enumerate() {
        if current.len_of(Axis(axis)) != length {
            current = resample_axis(current.view(), Axis(axis), length);
        }
    }
    Ok(current)
}

fn resample_axis(input: ArrayView3<'_, f32>, axis: Axis, length: usize) -> Array3<f32> {
    let samples = axis_samples(input.len_of(axis), length);

    let mut shape = input.raw_dim();
    shape[axis.index()] = length;
    let mut output = Array3::zeros(shape);

    for (source, mut destination) in input.lanes(axis).into_iter().zip(output.lanes_mut(axis)) {
        for (value, sample) in destination.iter_mut().zip(&samples) {
            let a = source.get(sample.lower).copied().unwrap_or(0.0);
            let b = source.get(sample.upper).copied().unwrap_or(a);
            *value = (b - a).mul_add(sample.weight, a);
        }
    }

    output
}
