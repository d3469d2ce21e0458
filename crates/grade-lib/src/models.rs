//! Core data models for the grade predictor

use crate::artifacts::MetricsRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Course code to grade
pub type Grades = BTreeMap<String, f64>;

/// Prediction request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradeInput {
    /// Known S1-S4 grades. Missing courses default to 50.0.
    pub grades: Grades,
}

/// Prediction response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradePrediction {
    /// Predicted S5-S6 grades, each within [0, 100]
    pub predictions: Grades,
    pub model_used: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub model_name: Option<String>,
}

/// Description of the loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub input_courses: Vec<String>,
    pub output_courses: Vec<String>,
    pub metrics: MetricsRecord,
}

/// Course code listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseList {
    pub courses: Vec<String>,
}
