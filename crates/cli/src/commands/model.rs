//! Server and model status commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_success, print_table, OutputFormat};

/// Row for the model metrics table
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Show server health and whether a model is loaded
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            let loaded = if health.model_loaded { "loaded" } else { "not loaded" };
            println!("Server:  {}", color_status(&health.status));
            println!("Model:   {}", color_status(loaded));
            if let Some(name) = &health.model_name {
                println!("Name:    {}", name.cyan());
            }
        }
    }

    Ok(())
}

/// Show the loaded model's name, course counts and training metrics
pub async fn show_info(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info = client.model_info().await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            println!("{}", "Model Info".bold());
            println!("{}", "=".repeat(40));
            println!("Model:           {}", info.model_name.cyan());
            println!("Input courses:   {}", info.input_courses.len());
            println!("Output courses:  {}", info.output_courses.len());
            println!();

            print_table(&[
                MetricRow {
                    metric: "RMSE",
                    value: format!("{:.4}", info.metrics.rmse),
                },
                MetricRow {
                    metric: "R²",
                    value: format!("{:.4}", info.metrics.r2),
                },
                MetricRow {
                    metric: "CV R²",
                    value: format!("{:.4}", info.metrics.cv_r2),
                },
            ]);
        }
    }

    Ok(())
}

/// Ask the server to reload its model
pub async fn reload(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.reload().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success(&format!("Reloaded model {}", result.model_name.cyan()));
        }
    }

    Ok(())
}
