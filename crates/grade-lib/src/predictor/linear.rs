//! Multi-output linear regressor stored as JSON
//!
//! ```json
//! {"coefficients": [[0.4, 0.3, ...], ...], "intercepts": [12.5, ...]}
//! ```
//! One coefficient row and one intercept per target course.

use super::Regressor;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl LinearRegressor {
    pub fn new(coefficients: Vec<Vec<f64>>, intercepts: Vec<f64>) -> Result<Self> {
        if coefficients.is_empty() {
            anyhow::bail!("Linear model has no outputs");
        }
        if coefficients.len() != intercepts.len() {
            anyhow::bail!(
                "Linear model has {} coefficient rows but {} intercepts",
                coefficients.len(),
                intercepts.len()
            );
        }
        let width = coefficients[0].len();
        if width == 0 {
            anyhow::bail!("Linear model has no inputs");
        }
        if let Some(row) = coefficients.iter().position(|r| r.len() != width) {
            anyhow::bail!(
                "Coefficient row {} has {} values, expected {}",
                row,
                coefficients[row].len(),
                width
            );
        }

        Ok(Self { coefficients, intercepts })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: LinearRegressor =
            serde_json::from_slice(bytes).context("Failed to parse linear model JSON")?;
        Self::new(raw.coefficients, raw.intercepts)
    }

    fn width(&self) -> usize {
        self.coefficients[0].len()
    }
}

impl Regressor for LinearRegressor {
    fn predict_row(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.width() {
            anyhow::bail!(
                "Feature row has {} values, model expects {}",
                features.len(),
                self.width()
            );
        }

        Ok(self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, intercept)| {
                intercept + row.iter().zip(features).map(|(w, x)| w * x).sum::<f64>()
            })
            .collect())
    }

    fn input_width(&self) -> Option<usize> {
        Some(self.width())
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}
