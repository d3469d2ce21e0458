//! Feature row construction
//!
//! Maps a sparse course-to-grade mapping onto the fixed feature schema order.

use crate::artifacts::CourseSchema;
use crate::models::Grades;

/// Grade assumed for a course the student has no grade for. Unknown
/// performance is treated as middling performance.
pub const DEFAULT_GRADE: f64 = 50.0;

/// Build the model input row in schema order. Courses missing from `grades`
/// take [`DEFAULT_GRADE`]; grades for courses outside the schema are ignored.
pub fn build_feature_row(schema: &CourseSchema, grades: &Grades) -> Vec<f64> {
    schema
        .iter()
        .map(|course| grades.get(course).copied().unwrap_or(DEFAULT_GRADE))
        .collect()
}
