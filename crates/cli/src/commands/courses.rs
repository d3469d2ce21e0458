//! Course listing commands

use anyhow::Result;
use clap::ValueEnum;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{print_json, print_table, OutputFormat};

/// Which course schema to list
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CourseSet {
    /// S1-S4 courses the model takes as input
    Input,
    /// S5-S6 courses the model predicts
    Output,
}

impl CourseSet {
    fn as_path(self) -> &'static str {
        match self {
            CourseSet::Input => "input",
            CourseSet::Output => "output",
        }
    }
}

#[derive(Tabled)]
struct CourseRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Course")]
    code: String,
}

/// List input or output course codes in schema order
pub async fn list_courses(client: &ApiClient, set: CourseSet, format: OutputFormat) -> Result<()> {
    let result = client.courses(set.as_path()).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let rows: Vec<CourseRow> = result
                .courses
                .into_iter()
                .enumerate()
                .map(|(i, code)| CourseRow { index: i + 1, code })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}
