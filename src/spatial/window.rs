//! Axis-aligned crop windows centred on a predicted point of interest

use std::fmt;
use std::ops::Range;

/// Human-readable names of the volume axes, in storage order
pub const AXIS_NAMES: [&str; 3] = ["depth", "height", "width"];

/// A fixed-size 3D sub-region that lies entirely inside its source volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    start: [usize; 3],
    size: [usize; 3],
}

impl CropWindow {
    /// Build the window of `size` centred on `centre`, validated against `bounds`
    ///
    /// The window starts at `centre - size / 2` (integer division) on every
    /// axis. No clipping is attempted: a window that would cross a volume
    /// boundary is reported as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`CropOutOfBounds`] describing the first offending axis
    pub fn centred(
        centre: [i64; 3],
        size: [usize; 3],
        bounds: [usize; 3],
    ) -> Result<Self, CropOutOfBounds> {
        let mut start = [0usize; 3];

        for (axis, (first_voxel, ((&c, &extent), &available))) in start
            .iter_mut()
            .zip(centre.iter().zip(&size).zip(&bounds))
            .enumerate()
        {
            // Saturated bounds lie outside every volume
            let extent_signed = i64::try_from(extent).unwrap_or(i64::MAX);
            let first = c.saturating_sub(extent_signed / 2);
            let last = first.saturating_add(extent_signed);
            let available_signed = i64::try_from(available).unwrap_or(i64::MAX);

            if first < 0 || last > available_signed || extent == 0 {
                return Err(CropOutOfBounds {
                    axis,
                    centre,
                    requested: first..last,
                    available,
                });
            }
            *first_voxel = first as usize;
        }

        Ok(Self { start, size })
    }

    /// First voxel of the window on each axis
    pub const fn start(&self) -> [usize; 3] {
        self.start
    }

    /// Extent of the window on each axis
    pub const fn size(&self) -> [usize; 3] {
        self.size
    }

    /// One past the last voxel of the window on each axis
    pub const fn end(&self) -> [usize; 3] {
        [
            self.start[0] + self.size[0],
            self.start[1] + self.size[1],
            self.start[2] + self.size[2],
        ]
    }

    /// Index ranges covered by the window
    pub const fn ranges(&self) -> [Range<usize>; 3] {
        let end = self.end();
        [
            self.start[0]..end[0],
            self.start[1]..end[1],
            self.start[2]..end[2],
        ]
    }

    /// Check the window is contained in a volume of the given shape
    pub fn fits_within(&self, shape: [usize; 3]) -> bool {
        self.end().iter().zip(shape).all(|(&end, dim)| end <= dim)
    }
}

/// A crop window that would extend beyond the volume it is taken from
///
/// Almost always the sign of a bad localisation prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropOutOfBounds {
    /// Axis (0 = depth, 1 = height, 2 = width) that was violated first
    pub axis: usize,
    /// Centre the window was built around, in full-resolution voxels
    pub centre: [i64; 3],
    /// Voxel range the window asked for on the offending axis
    pub requested: Range<i64>,
    /// Length of the volume along the offending axis
    pub available: usize,
}

impl fmt::Display for CropOutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = AXIS_NAMES.get(self.axis).copied().unwrap_or("unknown");
        write!(
            f,
            "crop window around {:?} needs {}..{} on axis {} ({name}) but only 0..{} is available",
            self.centre, self.requested.start, self.requested.end, self.axis, self.available
        )
    }
}

impl std::error::Error for CropOutOfBounds {}
