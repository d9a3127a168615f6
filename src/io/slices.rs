//! Assembling a volume from a directory of 2D slice images

use crate::io::configuration::SLICE_EXTENSIONS;
use crate::io::error::{PipelineError, Result, file_system_error};
use crate::io::volume_file::tiff_page_count;
use crate::spatial::Volume;
use image::DynamicImage;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use std::path::{Path, PathBuf};

/// Slice files in `dir`, sorted lexicographically by file name
///
/// Files with other extensions and sub-directories are ignored.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or holds no slices
pub fn slice_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(file_system_error(dir, "list slice directory"))? {
        let path = entry
            .map_err(file_system_error(dir, "list slice directory"))?
            .path();
        if path.is_file() && is_slice_file(&path) {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(PipelineError::EmptySliceDirectory {
            path: dir.to_path_buf(),
        });
    }
    paths.sort();
    Ok(paths)
}

/// Whether `path` has one of the slice image extensions
pub fn is_slice_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SLICE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Stack the slices of `dir` along a new leading axis
///
/// # Errors
///
/// Returns an error if the directory holds no slices, a slice is not a
/// single-channel 2D image, or slices disagree in shape or sample type
pub fn read_slice_stack(dir: &Path) -> Result<Volume> {
    let paths = slice_paths(dir)?;
    let mut slices = SliceStack::default();

    for path in &paths {
        slices.push(path, read_slice(path)?)?;
    }

    let volume = slices.stack(dir)?;
    log::debug!(
        "Stacked {} slices from {} into {:?}",
        paths.len(),
        dir.display(),
        volume.shape()
    );
    Ok(volume)
}

enum Slice {
    U8(Array2<u8>),
    U16(Array2<u16>),
}

impl Slice {
    fn shape(&self) -> [usize; 2] {
        let (h, w) = match self {
            Self::U8(a) => a.dim(),
            Self::U16(a) => a.dim(),
        };
        [h, w]
    }

    const fn type_name(&self) -> &'static str {
        match self {
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
        }
    }
}

fn read_slice(path: &Path) -> Result<Slice> {
    // A multi-page file in a slice directory would make the stack 4D
    let pages = tiff_page_count(path)?;
    if pages != 1 {
        return Err(PipelineError::InvalidDimensions {
            path: path.to_path_buf(),
            shape: vec![pages],
            reason: "slice directories must hold 2D images; \
                     was a directory of 3D images given with 2D stacking?"
                .to_string(),
        });
    }

    let image = image::open(path).map_err(|source| PipelineError::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    let (width, height) = (image.width() as usize, image.height() as usize);
    let shape_error = |e: ndarray::ShapeError| PipelineError::InvalidDimensions {
        path: path.to_path_buf(),
        shape: vec![height, width],
        reason: e.to_string(),
    };

    match image {
        DynamicImage::ImageLuma8(buffer) => Array2::from_shape_vec((height, width), buffer.into_raw())
            .map(Slice::U8)
            .map_err(shape_error),
        DynamicImage::ImageLuma16(buffer) => {
            Array2::from_shape_vec((height, width), buffer.into_raw())
                .map(Slice::U16)
                .map_err(shape_error)
        }
        other => Err(PipelineError::InvalidDimensions {
            path: path.to_path_buf(),
            shape: vec![height, width, usize::from(other.color().channel_count())],
            reason: "slices must be single-channel 8 or 16 bit images".to_string(),
        }),
    }
}

#[derive(Default)]
struct SliceStack {
    u8_slices: Vec<Array2<u8>>,
    u16_slices: Vec<Array2<u16>>,
    first: Option<([usize; 2], &'static str)>,
}

impl SliceStack {
    fn push(&mut self, path: &Path, slice: Slice) -> Result<()> {
        let shape = slice.shape();
        let type_name = slice.type_name();

        if let Some((first_shape, first_type)) = self.first {
            if first_shape != shape {
                return Err(PipelineError::SliceMismatch {
                    path: path.to_path_buf(),
                    reason: format!("shape {shape:?} differs from first slice {first_shape:?}"),
                });
            }
            if first_type != type_name {
                return Err(PipelineError::SliceMismatch {
                    path: path.to_path_buf(),
                    reason: format!("sample type {type_name} differs from first slice {first_type}"),
                });
            }
        } else {
            self.first = Some((shape, type_name));
        }

        match slice {
            Slice::U8(a) => self.u8_slices.push(a),
            Slice::U16(a) => self.u16_slices.push(a),
        }
        Ok(())
    }

    fn stack(self, dir: &Path) -> Result<Volume> {
        if self.u16_slices.is_empty() {
            Volume::new(stack_slices(dir, &self.u8_slices)?)
        } else {
            Volume::new(stack_slices(dir, &self.u16_slices)?)
        }
    }
}

fn stack_slices<T: Clone>(dir: &Path, slices: &[Array2<T>]) -> Result<Array3<T>> {
    let views: Vec<ArrayView2<'_, T>> = slices.iter().map(Array2::view).collect();
    ndarray::stack(Axis(0), &views).map_err(|e| PipelineError::InvalidDimensions {
        path: dir.to_path_buf(),
        shape: vec![slices.len()],
        reason: e.to_string(),
    })
}
