//! Immutable 3D scalar volumes in their native sample type
//!
//! Scanners hand out 8- and 16-bit integers as well as floating point data.
//! A [`Volume`] keeps whatever it was loaded with so that crops are written
//! back unchanged, and offers a single scaled `f32` view for the networks.

use crate::io::error::{PipelineError, Result, invalid_parameter};
use crate::spatial::window::CropWindow;
use ndarray::{Array3, ArrayView3, s};
use num_traits::{AsPrimitive, Bounded};
use std::fmt;

/// Sample type of the voxels in a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// Signed 16-bit integer
    I16,
    /// 32-bit float
    F32,
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::F32 => "f32",
        };
        f.write_str(name)
    }
}

/// Voxel storage for each supported sample type, indexed (depth, height, width)
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelData {
    /// Unsigned 8-bit voxels
    U8(Array3<u8>),
    /// Unsigned 16-bit voxels
    U16(Array3<u16>),
    /// Signed 16-bit voxels
    I16(Array3<i16>),
    /// Floating point voxels
    F32(Array3<f32>),
}

impl VoxelData {
    /// Shape as (depth, height, width)
    pub fn shape(&self) -> [usize; 3] {
        match self {
            Self::U8(a) => shape_of(a),
            Self::U16(a) => shape_of(a),
            Self::I16(a) => shape_of(a),
            Self::F32(a) => shape_of(a),
        }
    }

    /// Sample type of the stored voxels
    pub const fn sample_type(&self) -> SampleType {
        match self {
            Self::U8(_) => SampleType::U8,
            Self::U16(_) => SampleType::U16,
            Self::I16(_) => SampleType::I16,
            Self::F32(_) => SampleType::F32,
        }
    }
}

impl From<Array3<u8>> for VoxelData {
    fn from(array: Array3<u8>) -> Self {
        Self::U8(array)
    }
}

impl From<Array3<u16>> for VoxelData {
    fn from(array: Array3<u16>) -> Self {
        Self::U16(array)
    }
}

impl From<Array3<i16>> for VoxelData {
    fn from(array: Array3<i16>) -> Self {
        Self::I16(array)
    }
}

impl From<Array3<f32>> for VoxelData {
    fn from(array: Array3<f32>) -> Self {
        Self::F32(array)
    }
}

/// A non-empty 3D array of scalar intensities
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: VoxelData,
}

impl Volume {
    /// Wrap voxel data, rejecting shapes with an empty axis
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyVolume`] if any axis has length zero
    pub fn new(data: impl Into<VoxelData>) -> Result<Self> {
        let data = data.into();
        let shape = data.shape();
        if shape.contains(&0) {
            return Err(PipelineError::EmptyVolume { shape });
        }
        Ok(Self { data })
    }

    /// Shape as (depth, height, width)
    pub fn shape(&self) -> [usize; 3] {
        self.data.shape()
    }

    /// Number of voxels
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Always false; kept for API symmetry with [`Volume::len`]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Sample type of the stored voxels
    pub const fn sample_type(&self) -> SampleType {
        self.data.sample_type()
    }

    /// Borrow the underlying voxel storage
    pub const fn data(&self) -> &VoxelData {
        &self.data
    }

    /// Take the underlying voxel storage
    pub fn into_data(self) -> VoxelData {
        self.data
    }

    /// Intensities rescaled to the float range the networks were trained on
    ///
    /// Unsigned integers are divided by their type maximum, `i16` is mapped
    /// linearly from its full range onto `[0, 1]`, floats pass through.
    pub fn to_unit_f32(&self) -> Array3<f32> {
        match &self.data {
            VoxelData::U8(a) => scale_unsigned(a.view()),
            VoxelData::U16(a) => scale_unsigned(a.view()),
            VoxelData::I16(a) => scale_signed(a.view()),
            VoxelData::F32(a) => a.clone(),
        }
    }

    /// Copy out the region covered by `window`
    ///
    /// # Errors
    ///
    /// Returns an error if the window does not lie entirely inside the volume
    pub fn crop(&self, window: &CropWindow) -> Result<Self> {
        let shape = self.shape();
        if !window.fits_within(shape) {
            return Err(invalid_parameter(
                "window",
                &format!("{:?}..{:?}", window.start(), window.end()),
                &format!("does not fit inside volume of shape {shape:?}"),
            ));
        }

        let [z, y, x] = window.ranges();
        let data = match &self.data {
            VoxelData::U8(a) => VoxelData::U8(a.slice(s![z, y, x]).to_owned()),
            VoxelData::U16(a) => VoxelData::U16(a.slice(s![z, y, x]).to_owned()),
            VoxelData::I16(a) => VoxelData::I16(a.slice(s![z, y, x]).to_owned()),
            VoxelData::F32(a) => VoxelData::F32(a.slice(s![z, y, x]).to_owned()),
        };
        Self::new(data)
    }
}

/// Shape of a 3D array as a fixed-size array
pub fn shape_of<T>(array: &Array3<T>) -> [usize; 3] {
    let (d, h, w) = array.dim();
    [d, h, w]
}

fn scale_unsigned<T>(array: ArrayView3<'_, T>) -> Array3<f32>
where
    T: AsPrimitive<f32> + Bounded,
{
    let max: f32 = T::max_value().as_();
    array.mapv(|v| v.as_() / max)
}

fn scale_signed<T>(array: ArrayView3<'_, T>) -> Array3<f32>
where
    T: AsPrimitive<f32> + Bounded,
{
    let min: f32 = T::min_value().as_();
    let range = T::max_value().as_() - min;
    array.mapv(|v| (v.as_() - min) / range)
}
