//! Reading and writing single-file volumes
//!
//! Multi-page TIFF files hold one page per slice along the depth axis.
//! DICOM files must carry a single-sample multi-frame image; frames become
//! the depth axis. Output is always TIFF, in the volume's own sample type.

use crate::io::configuration::{DICOM_EXTENSION, TIFF_EXTENSIONS};
use crate::io::error::{PipelineError, Result, file_system_error};
use crate::spatial::{Volume, VoxelData};
use dicom_pixeldata::{PixelDecoder, PixelRepresentation};
use ndarray::{Array3, ArrayView2, Axis};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{TiffEncoder, colortype};

/// On-disk volume formats recognised by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeFormat {
    /// Multi-page TIFF
    Tiff,
    /// DICOM multi-frame image
    Dicom,
}

impl VolumeFormat {
    /// Recognise a volume file by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        if TIFF_EXTENSIONS.contains(&extension.as_str()) {
            Some(Self::Tiff)
        } else if extension == DICOM_EXTENSION {
            Some(Self::Dicom)
        } else {
            None
        }
    }
}

/// Read a volume file in whichever format its extension names
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedInput`] for unknown extensions, or
/// any decoding error of the format
pub fn read_volume(path: &Path) -> Result<Volume> {
    match VolumeFormat::from_path(path) {
        Some(VolumeFormat::Tiff) => read_tiff_volume(path),
        Some(VolumeFormat::Dicom) => read_dicom_volume(path),
        None => Err(PipelineError::UnsupportedInput {
            path: path.to_path_buf(),
        }),
    }
}

struct TiffPages {
    page_shape: [usize; 2],
    data: VoxelData,
}

/// Read a multi-page TIFF as a volume
///
/// # Errors
///
/// Returns an error if the file cannot be decoded, pages differ in size or
/// sample type, or the file has a single page
pub fn read_tiff_volume(path: &Path) -> Result<Volume> {
    let pages = read_tiff_pages(path)?;
    let shape = pages.data.shape();
    if shape[0] < 2 {
        return Err(PipelineError::InvalidDimensions {
            path: path.to_path_buf(),
            shape: pages.page_shape.to_vec(),
            reason: "expected a 3D image but the file holds a single page".to_string(),
        });
    }
    Volume::new(pages.data)
}

/// Number of pages in a TIFF file, without decoding any pixels
///
/// # Errors
///
/// Returns an error if the file cannot be opened or its directory chain is corrupt
pub fn tiff_page_count(path: &Path) -> Result<usize> {
    let read_error = |e: tiff::TiffError| PipelineError::VolumeRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let file = File::open(path).map_err(file_system_error(path, "open image"))?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(read_error)?;
    let mut pages = 1;
    while decoder.more_images() {
        decoder.next_image().map_err(read_error)?;
        pages += 1;
    }
    Ok(pages)
}

fn read_tiff_pages(path: &Path) -> Result<TiffPages> {
    let read_error = |reason: String| PipelineError::VolumeRead {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(file_system_error(path, "open volume"))?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| read_error(e.to_string()))?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions().map_err(|e| read_error(e.to_string()))?;
    let page_shape = [height as usize, width as usize];
    let page_len = page_shape[0] * page_shape[1];

    let mut pages = Vec::new();
    loop {
        let dimensions = decoder.dimensions().map_err(|e| read_error(e.to_string()))?;
        if dimensions != (width, height) {
            return Err(PipelineError::InvalidDimensions {
                path: path.to_path_buf(),
                shape: vec![dimensions.1 as usize, dimensions.0 as usize],
                reason: format!("page {} differs from first page {page_shape:?}", pages.len()),
            });
        }

        pages.push(decoder.read_image().map_err(|e| read_error(e.to_string()))?);

        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(|e| read_error(e.to_string()))?;
    }

    let depth = pages.len();
    let data = concatenate_pages(pages, page_len)
        .map_err(read_error)
        .and_then(|data| to_voxel_data(path, [depth, page_shape[0], page_shape[1]], data))?;
    Ok(TiffPages { page_shape, data })
}

enum PageSamples {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    F32(Vec<f32>),
}

fn concatenate_pages(
    pages: Vec<DecodingResult>,
    page_len: usize,
) -> std::result::Result<PageSamples, String> {
    let mut samples: Option<PageSamples> = None;

    for (index, page) in pages.into_iter().enumerate() {
        let length = match &page {
            DecodingResult::U8(v) => v.len(),
            DecodingResult::U16(v) => v.len(),
            DecodingResult::I16(v) => v.len(),
            DecodingResult::F32(v) => v.len(),
            _ => return Err("only 8/16-bit integer and 32-bit float samples are supported".into()),
        };
        if length != page_len {
            return Err(format!(
                "page {index} has {length} samples, expected one per pixel ({page_len})"
            ));
        }

        samples = Some(match (samples, page) {
            (None, DecodingResult::U8(v)) => PageSamples::U8(v),
            (None, DecodingResult::U16(v)) => PageSamples::U16(v),
            (None, DecodingResult::I16(v)) => PageSamples::I16(v),
            (None, DecodingResult::F32(v)) => PageSamples::F32(v),
            (Some(PageSamples::U8(mut all)), DecodingResult::U8(v)) => {
                all.extend(v);
                PageSamples::U8(all)
            }
            (Some(PageSamples::U16(mut all)), DecodingResult::U16(v)) => {
                all.extend(v);
                PageSamples::U16(all)
            }
            (Some(PageSamples::I16(mut all)), DecodingResult::I16(v)) => {
                all.extend(v);
                PageSamples::I16(all)
            }
            (Some(PageSamples::F32(mut all)), DecodingResult::F32(v)) => {
                all.extend(v);
                PageSamples::F32(all)
            }
            _ => return Err(format!("page {index} has a different sample type")),
        });
    }

    samples.ok_or_else(|| "file holds no pages".to_string())
}

fn to_voxel_data(path: &Path, shape: [usize; 3], samples: PageSamples) -> Result<VoxelData> {
    let dims = (shape[0], shape[1], shape[2]);
    let shape_error = |e: ndarray::ShapeError| PipelineError::InvalidDimensions {
        path: path.to_path_buf(),
        shape: shape.to_vec(),
        reason: e.to_string(),
    };

    Ok(match samples {
        PageSamples::U8(v) => Array3::from_shape_vec(dims, v).map_err(shape_error)?.into(),
        PageSamples::U16(v) => Array3::from_shape_vec(dims, v).map_err(shape_error)?.into(),
        PageSamples::I16(v) => Array3::from_shape_vec(dims, v).map_err(shape_error)?.into(),
        PageSamples::F32(v) => Array3::from_shape_vec(dims, v).map_err(shape_error)?.into(),
    })
}

/// Read a DICOM multi-frame image as a volume
///
/// Only the pixel data is kept. 8-bit data stays `u8`, 16-bit data becomes
/// `u16` or `i16` following the pixel representation, anything wider is
/// converted to `f32`.
///
/// # Errors
///
/// Returns an error if the file cannot be decoded or does not describe a
/// single-sample 3D image
pub fn read_dicom_volume(path: &Path) -> Result<Volume> {
    let read_error = |reason: String| PipelineError::VolumeRead {
        path: path.to_path_buf(),
        reason,
    };

    let object = dicom_object::open_file(path).map_err(|e| read_error(e.to_string()))?;
    let pixels = object
        .decode_pixel_data()
        .map_err(|e| read_error(e.to_string()))?;

    let frames = pixels.number_of_frames() as usize;
    let rows = pixels.rows() as usize;
    let columns = pixels.columns() as usize;
    let samples = usize::from(pixels.samples_per_pixel());

    if samples != 1 || frames < 2 {
        let mut shape = vec![frames, rows, columns];
        if samples != 1 {
            shape.push(samples);
        }
        return Err(PipelineError::InvalidDimensions {
            path: path.to_path_buf(),
            shape,
            reason: "expected a single-sample multi-frame 3D image".to_string(),
        });
    }

    let dims = (frames, rows, columns);
    let shape_error = |e: ndarray::ShapeError| PipelineError::InvalidDimensions {
        path: path.to_path_buf(),
        shape: vec![frames, rows, columns],
        reason: e.to_string(),
    };
    let signed = matches!(pixels.pixel_representation(), PixelRepresentation::Signed);

    let data: VoxelData = match (pixels.bits_allocated(), signed) {
        (8, false) => {
            let values = pixels.to_vec::<u8>().map_err(|e| read_error(e.to_string()))?;
            Array3::from_shape_vec(dims, values).map_err(shape_error)?.into()
        }
        (16, false) => {
            let values = pixels.to_vec::<u16>().map_err(|e| read_error(e.to_string()))?;
            Array3::from_shape_vec(dims, values).map_err(shape_error)?.into()
        }
        (16, true) => {
            let values = pixels.to_vec::<i16>().map_err(|e| read_error(e.to_string()))?;
            Array3::from_shape_vec(dims, values).map_err(shape_error)?.into()
        }
        _ => {
            let values = pixels.to_vec::<f32>().map_err(|e| read_error(e.to_string()))?;
            Array3::from_shape_vec(dims, values).map_err(shape_error)?.into()
        }
    };

    log::debug!(
        "Read DICOM {} as {frames}x{rows}x{columns} {}",
        path.display(),
        data.sample_type()
    );
    Volume::new(data)
}

/// Write a volume as a multi-page TIFF in its own sample type
///
/// # Errors
///
/// Returns an error if the file cannot be created or encoded
pub fn write_volume(path: &Path, volume: &Volume) -> Result<()> {
    let file = File::create(path).map_err(file_system_error(path, "create volume"))?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file)).map_err(|e| {
        PipelineError::VolumeWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    match volume.data() {
        VoxelData::U8(a) => write_pages::<colortype::Gray8, _>(path, &mut encoder, a),
        VoxelData::U16(a) => write_pages::<colortype::Gray16, _>(path, &mut encoder, a),
        VoxelData::I16(a) => write_pages::<colortype::GrayI16, _>(path, &mut encoder, a),
        VoxelData::F32(a) => write_pages::<colortype::Gray32Float, _>(path, &mut encoder, a),
    }
}

fn write_pages<C, W>(path: &Path, encoder: &mut TiffEncoder<W>, array: &Array3<C::Inner>) -> Result<()>
where
    C: colortype::ColorType,
    C::Inner: Copy,
    [C::Inner]: tiff::encoder::TiffValue,
    W: std::io::Write + std::io::Seek,
{
    let (_, height, width) = array.dim();
    let write_error = |reason: String| PipelineError::VolumeWrite {
        path: path.to_path_buf(),
        reason,
    };
    let width = u32::try_from(width).map_err(|e| write_error(e.to_string()))?;
    let height = u32::try_from(height).map_err(|e| write_error(e.to_string()))?;

    for page in array.axis_iter(Axis(0)) {
        let samples = page_samples(page);
        encoder
            .write_image::<C>(width, height, &samples)
            .map_err(|e| write_error(e.to_string()))?;
    }
    Ok(())
}

fn page_samples<T: Copy>(page: ArrayView2<'_, T>) -> Vec<T> {
    page.iter().copied().collect()
}
