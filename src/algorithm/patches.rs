//! Sliding-window patch layout over a volume
//!
//! Origins along an axis advance by `patch - overlap` and a final origin is
//! placed flush with the far edge, so every voxel is covered and no patch
//! hangs over the end. Axes shorter than the patch get a single origin and
//! are zero-padded up to the patch extent.

use crate::io::error::{Result, configuration_error};
use std::ops::Range;

/// Deterministic set of patch origins covering a volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchGrid {
    shape: [usize; 3],
    patch_size: [usize; 3],
    axis_origins: [Vec<usize>; 3],
}

impl PatchGrid {
    /// Lay out patches of `patch_size` overlapping by `overlap` over `shape`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a patch extent is zero or the overlap
    /// leaves no room for the window to advance
    pub fn new(shape: [usize; 3], patch_size: [usize; 3], overlap: [usize; 3]) -> Result<Self> {
        let axis_origins = [
            axis_origins(shape[0], patch_size[0], overlap[0])?,
            axis_origins(shape[1], patch_size[1], overlap[1])?,
            axis_origins(shape[2], patch_size[2], overlap[2])?,
        ];
        Ok(Self {
            shape,
            patch_size,
            axis_origins,
        })
    }

    /// Shape of the volume the grid was laid over
    pub const fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Extent of every patch
    pub const fn patch_size(&self) -> [usize; 3] {
        self.patch_size
    }

    /// Shape after zero-padding axes shorter than the patch
    pub fn padded_shape(&self) -> [usize; 3] {
        [
            self.shape[0].max(self.patch_size[0]),
            self.shape[1].max(self.patch_size[1]),
            self.shape[2].max(self.patch_size[2]),
        ]
    }

    /// Number of patches in the grid
    pub fn len(&self) -> usize {
        self.axis_origins.iter().map(Vec::len).product()
    }

    /// Whether the grid holds no patches (never true for a validated grid)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Patch origins in raster order (depth slowest, width fastest)
    pub fn origins(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let [zs, ys, xs] = &self.axis_origins;
        zs.iter().flat_map(move |&z| {
            ys.iter()
                .flat_map(move |&y| xs.iter().map(move |&x| [z, y, x]))
        })
    }

    /// Index ranges of the patch starting at `origin`, in padded coordinates
    pub const fn region(&self, origin: [usize; 3]) -> [Range<usize>; 3] {
        [
            origin[0]..origin[0] + self.patch_size[0],
            origin[1]..origin[1] + self.patch_size[1],
            origin[2]..origin[2] + self.patch_size[2],
        ]
    }
}

/// Patch origins along one axis of `length` voxels
///
/// # Errors
///
/// Returns a configuration error if `patch` is zero or `overlap >= patch`
pub fn axis_origins(length: usize, patch: usize, overlap: usize) -> Result<Vec<usize>> {
    if patch == 0 {
        return Err(configuration_error(&"patch size must be positive"));
    }
    if overlap >= patch {
        return Err(configuration_error(&format!(
            "patch overlap {overlap} must be smaller than the patch size {patch}"
        )));
    }

    if length <= patch {
        return Ok(vec![0]);
    }

    let step = patch - overlap;
    let last = length - patch;
    let mut origins: Vec<usize> = (0..last).step_by(step).collect();
    origins.push(last);
    Ok(origins)
}
