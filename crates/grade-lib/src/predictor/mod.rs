//! Grade prediction engine
//!
//! A [`Regressor`] is the opaque trained model: one ordered feature row in,
//! one ordered output row out. The feature and output helpers turn a sparse
//! grade mapping into that row and the raw outputs back into bounded grades.

mod features;
mod inference;
mod linear;
mod output;

pub use features::{build_feature_row, DEFAULT_GRADE};
pub use inference::OnnxRegressor;
pub use linear::LinearRegressor;
pub use output::{clamp_grade, format_predictions, GRADE_DECIMALS, MAX_GRADE, MIN_GRADE};

use crate::error::LoadError;
use anyhow::Result;
use std::path::Path;

/// Trait for trained multi-output regressors
pub trait Regressor: Send + Sync {
    /// Evaluate one feature row
    fn predict_row(&self, features: &[f64]) -> Result<Vec<f64>>;

    /// Number of inputs the model declares, when the format exposes it
    fn input_width(&self) -> Option<usize>;

    /// Short format name for logs and metrics
    fn kind(&self) -> &'static str;
}

/// Serialized model formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    /// ONNX graph evaluated with tract
    Onnx,
    /// Multi-output linear model stored as JSON
    Linear,
}

impl ModelFormat {
    /// Pick the format from a file or artifact path extension
    pub fn from_path(path: &str) -> Result<Self, LoadError> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("onnx") => Ok(ModelFormat::Onnx),
            Some("json") => Ok(ModelFormat::Linear),
            _ => Err(LoadError::UnsupportedFormat(path.to_string())),
        }
    }
}

/// Deserialize a regressor from raw bytes. `n_features` pins the input
/// shape of graph formats.
pub fn load_regressor(
    bytes: &[u8],
    format: ModelFormat,
    n_features: usize,
) -> Result<Box<dyn Regressor>, LoadError> {
    let regressor: Box<dyn Regressor> = match format {
        ModelFormat::Onnx => {
            Box::new(OnnxRegressor::new(bytes, n_features).map_err(LoadError::Model)?)
        }
        ModelFormat::Linear => {
            Box::new(LinearRegressor::from_slice(bytes).map_err(LoadError::Model)?)
        }
    };
    Ok(regressor)
}
