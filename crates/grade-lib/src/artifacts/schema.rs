//! Ordered course code schemas
//!
//! The feature schema fixes the order of values fed to the model and the
//! target schema fixes the order of values read back. Both are stored as
//! JSON arrays of course codes.

use crate::error::LoadError;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Non-empty, duplicate-free ordered list of course codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CourseSchema {
    courses: Vec<String>,
}

impl CourseSchema {
    /// Build a schema, rejecting empty lists and repeated codes.
    /// `name` only labels errors ("feature" or "target").
    pub fn new(name: &'static str, courses: Vec<String>) -> Result<Self, LoadError> {
        if courses.is_empty() {
            return Err(LoadError::EmptySchema { schema: name });
        }

        let mut seen = HashSet::with_capacity(courses.len());
        for course in &courses {
            if !seen.insert(course.as_str()) {
                return Err(LoadError::DuplicateCourse {
                    schema: name,
                    course: course.clone(),
                });
            }
        }

        Ok(Self { courses })
    }

    /// Read a schema from a JSON array file
    pub fn from_file(name: &'static str, path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let courses: Vec<String> =
            serde_json::from_str(&content).map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Self::new(name, courses)
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.courses.iter().map(String::as_str)
    }

    pub fn courses(&self) -> &[String] {
        &self.courses
    }

    pub fn contains(&self, course: &str) -> bool {
        self.courses.iter().any(|c| c == course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_schema_preserves_order() {
        let schema = CourseSchema::new("feature", codes(&["M1100", "I1100", "P1101"])).unwrap();
        let order: Vec<&str> = schema.iter().collect();
        assert_eq!(order, vec!["M1100", "I1100", "P1101"]);
        assert_eq!(schema.len(), 3);
        assert!(schema.contains("I1100"));
        assert!(!schema.contains("I2202"));
    }

    #[test]
    fn test_empty_schema_rejected() {
        let err = CourseSchema::new("target", Vec::new()).unwrap_err();
        assert!(matches!(err, LoadError::EmptySchema { schema: "target" }));
    }

    #[test]
    fn test_duplicate_course_rejected() {
        let err =
            CourseSchema::new("feature", codes(&["M1100", "M1101", "M1100"])).unwrap_err();
        match err {
            LoadError::DuplicateCourse { course, .. } => assert_eq!(course, "M1100"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feature_columns.json");
        std::fs::write(&path, r#"["M1100", "M1101"]"#).unwrap();

        let schema = CourseSchema::from_file("feature", &path).unwrap();
        assert_eq!(schema.courses(), &["M1100".to_string(), "M1101".to_string()]);
    }

    #[test]
    fn test_from_file_missing() {
        let dir = TempDir::new().unwrap();
        let err =
            CourseSchema::from_file("feature", &dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_from_file_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("target_columns.json");
        std::fs::write(&path, "{not a list").unwrap();

        let err = CourseSchema::from_file("target", &path).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let schema = CourseSchema::new("target", codes(&["I3301", "I3302"])).unwrap();
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"["I3301","I3302"]"#);
    }
}
