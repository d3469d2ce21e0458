//! Prediction output post-processing
//!
//! Raw model outputs are clamped to the grade range, rounded to two
//! decimals and keyed by the target schema.

use crate::artifacts::CourseSchema;
use crate::error::PredictError;
use crate::models::Grades;

pub const MIN_GRADE: f64 = 0.0;
pub const MAX_GRADE: f64 = 100.0;
pub const GRADE_DECIMALS: usize = 2;

/// Clamp to [0, 100] and round to two decimals. NaN is passed through so the
/// caller can reject it.
///
/// Rounds the exact binary value with ties to even, as the decimal
/// formatter does.
pub fn clamp_grade(raw: f64) -> f64 {
    let clamped = raw.clamp(MIN_GRADE, MAX_GRADE);
    format!("{:.*}", GRADE_DECIMALS, clamped)
        .parse()
        .unwrap_or(clamped)
}

/// Key raw outputs by target course. The output row must have exactly one
/// value per target and contain no NaN.
pub fn format_predictions(targets: &CourseSchema, raw: &[f64]) -> Result<Grades, PredictError> {
    if raw.len() != targets.len() {
        return Err(PredictError::Failed(format!(
            "model produced {} outputs, target schema has {} courses",
            raw.len(),
            targets.len()
        )));
    }

    targets
        .iter()
        .zip(raw)
        .map(|(course, value)| {
            if value.is_nan() {
                Err(PredictError::Failed(format!("model produced NaN for {course}")))
            } else {
                Ok((course.to_string(), clamp_grade(*value)))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> CourseSchema {
        CourseSchema::new("target", vec!["I3301".to_string(), "I3302".to_string()]).unwrap()
    }

    #[test]
    fn test_clamp_and_round() {
        assert_eq!(clamp_grade(72.3456), 72.35);
        assert_eq!(clamp_grade(72.344), 72.34);
        assert_eq!(clamp_grade(-3.2), 0.0);
        assert_eq!(clamp_grade(104.999), 100.0);
        assert_eq!(clamp_grade(f64::INFINITY), 100.0);
        assert_eq!(clamp_grade(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_round_matches_exact_decimal_value() {
        // Exact binary ties go to even
        assert_eq!(clamp_grade(72.125), 72.12);
        assert_eq!(clamp_grade(0.125), 0.12);
        assert_eq!(clamp_grade(58.375), 58.38);
        // Stored just below the written value
        assert_eq!(clamp_grade(0.015), 0.01);
        assert_eq!(clamp_grade(1.005), 1.0);
        assert_eq!(clamp_grade(2.675), 2.67);
        assert!(clamp_grade(f64::NAN).is_nan());
    }

    #[test]
    fn test_format_keys_by_target_order() {
        let grades = format_predictions(&targets(), &[55.556, 120.0]).unwrap();
        assert_eq!(grades.len(), 2);
        assert_eq!(grades["I3301"], 55.56);
        assert_eq!(grades["I3302"], 100.0);
    }

    #[test]
    fn test_format_rounds_ties_to_even() {
        let grades = format_predictions(&targets(), &[72.125, 0.015]).unwrap();
        assert_eq!(grades["I3301"], 72.12);
        assert_eq!(grades["I3302"], 0.01);
    }

    #[test]
    fn test_output_length_mismatch_fails() {
        let err = format_predictions(&targets(), &[50.0]).unwrap_err();
        assert!(matches!(err, PredictError::Failed(_)));
    }

    #[test]
    fn test_nan_output_fails() {
        let err = format_predictions(&targets(), &[50.0, f64::NAN]).unwrap_err();
        match err {
            PredictError::Failed(msg) => assert!(msg.contains("I3302")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
