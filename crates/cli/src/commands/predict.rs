//! Grade prediction command

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_grade, print_json, print_table, print_warning, OutputFormat};

/// Row for predictions table
#[derive(Tabled)]
struct PredictionRow {
    #[tabled(rename = "Course")]
    course: String,
    #[tabled(rename = "Predicted")]
    grade: String,
}

/// Grades file: either a bare `{code: grade}` object or a request body
#[derive(Deserialize)]
#[serde(untagged)]
enum GradesFile {
    Request { grades: BTreeMap<String, f64> },
    Bare(BTreeMap<String, f64>),
}

/// Parse a `CODE=GRADE` argument
pub fn parse_grade_arg(arg: &str) -> Result<(String, f64)> {
    let (code, grade) = arg
        .split_once('=')
        .with_context(|| format!("Expected CODE=GRADE, got '{arg}'"))?;

    let code = code.trim();
    if code.is_empty() {
        bail!("Missing course code in '{arg}'");
    }

    let grade: f64 = grade
        .trim()
        .parse()
        .with_context(|| format!("Invalid grade in '{arg}'"))?;
    check_grade(code, grade)?;

    Ok((code.to_string(), grade))
}

/// Grades must be finite. The server accepts any range, so values outside
/// [0, 100] only warn.
fn check_grade(code: &str, grade: f64) -> Result<()> {
    if !grade.is_finite() {
        bail!("Grade for {code} must be a number, got {grade}");
    }
    if !(0.0..=100.0).contains(&grade) {
        print_warning(&format!("Grade for {code} is outside 0-100: {grade}"));
    }
    Ok(())
}

/// Read grades from a JSON file
pub fn read_grades_file(path: &Path) -> Result<BTreeMap<String, f64>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: GradesFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse grades in {}", path.display()))?;

    let grades = match parsed {
        GradesFile::Request { grades } | GradesFile::Bare(grades) => grades,
    };
    for (code, grade) in &grades {
        check_grade(code, *grade)?;
    }
    Ok(grades)
}

/// Merge file grades with command-line grades. Command-line values win.
pub fn collect_grades(args: &[String], file: Option<&Path>) -> Result<BTreeMap<String, f64>> {
    let mut grades = match file {
        Some(path) => read_grades_file(path)?,
        None => BTreeMap::new(),
    };

    for arg in args {
        let (code, grade) = parse_grade_arg(arg)?;
        grades.insert(code, grade);
    }

    Ok(grades)
}

/// Give every input course without a grade the `fill` value
pub fn fill_missing(grades: &mut BTreeMap<String, f64>, courses: &[String], fill: f64) {
    for course in courses {
        grades.entry(course.clone()).or_insert(fill);
    }
}

/// Request a prediction for the given grades
pub async fn predict(
    client: &ApiClient,
    args: &[String],
    file: Option<&Path>,
    fill: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let mut grades = collect_grades(args, file)?;

    if let Some(fill) = fill {
        check_grade("--fill", fill)?;
        let courses = client.courses("input").await?.courses;

        let unknown: Vec<&str> = grades
            .keys()
            .filter(|code| !courses.contains(*code))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            print_warning(&format!("Ignored by the model: {}", unknown.join(", ")));
        }

        fill_missing(&mut grades, &courses, fill);
    }

    let result = client.predict(grades).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("Model: {}", result.model_used);
            let rows: Vec<PredictionRow> = result
                .predictions
                .into_iter()
                .map(|(course, grade)| PredictionRow {
                    course,
                    grade: color_grade(grade),
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_grade_arg() {
        assert_eq!(
            parse_grade_arg("M1100=75").unwrap(),
            ("M1100".to_string(), 75.0)
        );
        assert_eq!(
            parse_grade_arg(" I1100 = 62.5 ").unwrap(),
            ("I1100".to_string(), 62.5)
        );
    }

    #[test]
    fn test_parse_grade_arg_rejects_bad_input() {
        assert!(parse_grade_arg("M1100").is_err());
        assert!(parse_grade_arg("=75").is_err());
        assert!(parse_grade_arg("M1100=high").is_err());
        assert!(parse_grade_arg("M1100=NaN").is_err());
        assert!(parse_grade_arg("M1100=inf").is_err());
    }

    #[test]
    fn test_out_of_range_grades_are_sent() {
        assert_eq!(
            parse_grade_arg("M1100=101").unwrap(),
            ("M1100".to_string(), 101.0)
        );
        assert_eq!(
            parse_grade_arg("M1100=-1").unwrap(),
            ("M1100".to_string(), -1.0)
        );
    }

    #[test]
    fn test_collect_grades_from_file_and_args() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grades.json");
        std::fs::write(&path, r#"{"grades": {"M1100": 60.0, "P1101": 71.0}}"#).unwrap();

        let grades = collect_grades(&["M1100=80".to_string()], Some(&path)).unwrap();
        assert_eq!(grades["M1100"], 80.0);
        assert_eq!(grades["P1101"], 71.0);
    }

    #[test]
    fn test_bare_grades_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grades.json");
        std::fs::write(&path, r#"{"M1100": 55.0}"#).unwrap();

        assert_eq!(read_grades_file(&path).unwrap()["M1100"], 55.0);
    }

    #[test]
    fn test_grades_file_out_of_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grades.json");
        std::fs::write(&path, r#"{"M1100": 150.0}"#).unwrap();

        assert_eq!(read_grades_file(&path).unwrap()["M1100"], 150.0);
    }

    #[test]
    fn test_fill_missing_keeps_given_grades() {
        let mut grades = BTreeMap::from([("M1100".to_string(), 90.0)]);
        let courses = vec!["M1100".to_string(), "I1100".to_string()];

        fill_missing(&mut grades, &courses, 65.0);
        assert_eq!(grades["M1100"], 90.0);
        assert_eq!(grades["I1100"], 65.0);
    }
}
