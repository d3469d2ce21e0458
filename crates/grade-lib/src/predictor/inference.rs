//! ONNX inference using tract
//!
//! Evaluates regressors exported to ONNX (skl2onnx, onnxmltools) with a
//! fixed `[1, n_features]` float input.

use super::Regressor;
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based regressor
pub struct OnnxRegressor {
    model: TractModel,
    n_features: usize,
}

impl OnnxRegressor {
    /// Parse and optimize an ONNX model from bytes
    pub fn new(model_bytes: &[u8], n_features: usize) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, n_features]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok(Self { model, n_features })
    }

    fn row_to_tensor(&self, features: &[f64]) -> Result<Tensor> {
        let data: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, self.n_features), data)
            .context("Feature row does not match model input shape")?;
        Ok(array.into())
    }
}

impl Regressor for OnnxRegressor {
    fn predict_row(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features {
            anyhow::bail!(
                "Feature row has {} values, model expects {}",
                features.len(),
                self.n_features
            );
        }

        let start = Instant::now();
        let input = self.row_to_tensor(features)?;

        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        // Some exporters emit doubles; normalize before reading
        let output = output.cast_to::<f32>()?;
        let values: Vec<f64> = output
            .to_array_view::<f32>()?
            .iter()
            .map(|v| *v as f64)
            .collect();

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target", MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(values)
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `output = input @ W + B` with W = [[0.5, 0], [0, 0.5], [0.5, 0.5]]
    /// and B = [1, 2]
    const LINEAR_3X2: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/linear_3x2.onnx"
    ));

    #[test]
    fn test_onnx_predict_row() {
        let regressor = OnnxRegressor::new(LINEAR_3X2, 3).unwrap();
        assert_eq!(regressor.input_width(), Some(3));
        assert_eq!(regressor.kind(), "onnx");

        let out = regressor.predict_row(&[50.0, 70.0, 80.0]).unwrap();
        assert_eq!(out, vec![66.0, 77.0]);

        let out = regressor.predict_row(&[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn test_onnx_rejects_wrong_row_width() {
        let regressor = OnnxRegressor::new(LINEAR_3X2, 3).unwrap();
        assert!(regressor.predict_row(&[50.0, 70.0]).is_err());
    }
}
