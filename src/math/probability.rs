//! Output activations applied to raw network logits

use crate::io::error::{PipelineError, Result};
use ndarray::{Array3, Array4, Axis, Zip};
use serde::Deserialize;
use std::fmt;

/// Logistic function
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Activation a segmentation network requires on its output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Scores are used as produced; expects a single channel
    Identity,
    /// Logistic function per voxel; expects a single channel
    #[default]
    Sigmoid,
    /// Softmax across channels; the last channel is the foreground
    Softmax,
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Identity => "identity",
            Self::Sigmoid => "sigmoid",
            Self::Softmax => "softmax",
        };
        f.write_str(name)
    }
}

impl Activation {
    /// Reduce `(channels, depth, height, width)` logits to foreground probabilities
    ///
    /// # Errors
    ///
    /// Returns an error if the channel count does not suit the activation
    pub fn apply(self, logits: Array4<f32>) -> Result<Array3<f32>> {
        let channels = logits.len_of(Axis(0));
        let single_channel = matches!(self, Self::Identity | Self::Sigmoid);
        if channels == 0 || (single_channel && channels != 1) {
            return Err(PipelineError::ShapeMismatch {
                operation: "output activation",
                expected: vec![if single_channel { 1 } else { 2 }],
                actual: vec![channels],
            });
        }

        let activated = match self {
            Self::Identity => logits.index_axis_move(Axis(0), 0),
            Self::Sigmoid => logits.index_axis_move(Axis(0), 0).mapv_into(sigmoid),
            Self::Softmax => softmax_foreground(&logits, channels - 1),
        };
        Ok(activated)
    }
}

// Max-shifted for numerical stability
fn softmax_foreground(logits: &Array4<f32>, foreground: usize) -> Array3<f32> {
    let max = logits.fold_axis(Axis(0), f32::NEG_INFINITY, |&m, &v| m.max(v));

    let mut denominator = Array3::<f32>::zeros(max.raw_dim());
    for channel in logits.axis_iter(Axis(0)) {
        Zip::from(&mut denominator)
            .and(&channel)
            .and(&max)
            .for_each(|d, &v, &m| *d += (v - m).exp());
    }

    let numerator = logits.index_axis(Axis(0), foreground);
    Zip::from(&numerator)
        .and(&max)
        .and(&denominator)
        .map_collect(|&v, &m, &d| (v - m).exp() / d)
}
