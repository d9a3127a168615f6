//! ONNX Runtime backend for both networks
//!
//! A model named `jaw_locator` is read from `<model_dir>/jaw_locator.onnx`.
//! Segmentation bundles add `<model_dir>/<name>.json` holding their
//! [`SegmenterConfig`]. Networks take a `(1, 1, D, H, W)` float tensor; the
//! locator returns at least three values, the segmenter `(1, C, D, H, W)` logits.

use crate::io::configuration::{MODEL_CONFIG_EXTENSION, MODEL_EXTENSION};
use crate::io::error::{PipelineError, Result, model_error};
use crate::model::config::SegmenterConfig;
use crate::model::handle::{Device, Locator, ModelLoader, Segmenter};
use ndarray::{Array4, ArrayView3, Axis};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::Session;
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Loads networks exported to ONNX from a model directory
#[derive(Debug, Clone)]
pub struct OnnxModelLoader {
    model_dir: PathBuf,
}

impl OnnxModelLoader {
    /// Create a loader reading from `model_dir`
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    /// Path of the serialised network called `name`
    pub fn model_path(&self, name: &str) -> PathBuf {
        self.model_dir.join(name).with_extension(MODEL_EXTENSION)
    }

    /// Path of the training configuration of the segmentation bundle `name`
    pub fn config_path(&self, name: &str) -> PathBuf {
        self.model_dir.join(name).with_extension(MODEL_CONFIG_EXTENSION)
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load_locator(&self, name: &str, device: Device) -> Result<Arc<dyn Locator>> {
        let session = build_session(name, &self.model_path(name), device)?;
        Ok(Arc::new(OnnxLocator {
            name: name.to_string(),
            session: Mutex::new(session),
        }))
    }

    fn load_segmenter(&self, name: &str, device: Device) -> Result<Arc<dyn Segmenter>> {
        let config = SegmenterConfig::from_json_file(&self.config_path(name))?;
        let session = build_session(name, &self.model_path(name), device)?;
        log::debug!(
            "Segmenter '{name}' uses patch size {:?} with {} activation",
            config.patch_size,
            config.activation
        );
        Ok(Arc::new(OnnxSegmenter {
            name: name.to_string(),
            config,
            session: Mutex::new(session),
        }))
    }
}

fn build_session(name: &str, path: &Path, device: Device) -> Result<Session> {
    if !path.exists() {
        return Err(PipelineError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let builder = Session::builder().map_err(|e| model_error(name, &e))?;
    let builder = match device {
        Device::Cpu => builder,
        // CPU stays registered as the fallback for unsupported operators
        Device::Cuda => builder
            .with_execution_providers([
                CUDAExecutionProvider::default().build(),
                CPUExecutionProvider::default().build(),
            ])
            .map_err(|e| model_error(name, &e))?,
    };

    let session = builder
        .commit_from_file(path)
        .map_err(|e| model_error(name, &e))?;
    log::debug!("Loaded ONNX model '{name}' from {} on {device}", path.display());
    Ok(session)
}

fn run_single_input(
    name: &str,
    session: &Mutex<Session>,
    volume: ArrayView3<'_, f32>,
) -> Result<(Vec<usize>, Vec<f32>)> {
    let batch = volume.to_owned().insert_axis(Axis(0)).insert_axis(Axis(0));
    let tensor = Tensor::from_array(batch).map_err(|e| model_error(name, &e))?;

    let mut session = session.lock().map_err(|e| model_error(name, &e))?;
    let outputs = session
        .run(ort::inputs![tensor])
        .map_err(|e| model_error(name, &e))?;
    let (shape, data) = outputs[0]
        .try_extract_tensor::<f32>()
        .map_err(|e| model_error(name, &e))?;

    let shape = shape
        .iter()
        .map(|&d| usize::try_from(d).map_err(|e| model_error(name, &e)))
        .collect::<Result<Vec<_>>>()?;
    Ok((shape, data.to_vec()))
}

struct OnnxLocator {
    name: String,
    session: Mutex<Session>,
}

impl Locator for OnnxLocator {
    fn locate(&self, volume: ArrayView3<'_, f32>) -> Result<[f64; 3]> {
        let (_, values) = run_single_input(&self.name, &self.session, volume)?;
        match values.as_slice() {
            [z, y, x, ..] => Ok([f64::from(*z), f64::from(*y), f64::from(*x)]),
            _ => Err(model_error(
                &self.name,
                &format!("expected a 3D centre, got {} values", values.len()),
            )),
        }
    }
}

struct OnnxSegmenter {
    name: String,
    config: SegmenterConfig,
    session: Mutex<Session>,
}

impl Segmenter for OnnxSegmenter {
    fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    fn predict_patch(&self, patch: ArrayView3<'_, f32>) -> Result<Array4<f32>> {
        let (shape, values) = run_single_input(&self.name, &self.session, patch)?;
        let (d, h, w) = patch.dim();

        match shape.as_slice() {
            [1, channels, pd, ph, pw] if (*pd, *ph, *pw) == (d, h, w) => {
                Array4::from_shape_vec((*channels, d, h, w), values)
                    .map_err(|e| model_error(&self.name, &e))
            }
            _ => Err(PipelineError::ShapeMismatch {
                operation: "segmentation network output",
                expected: vec![1, 0, d, h, w],
                actual: shape,
            }),
        }
    }
}
