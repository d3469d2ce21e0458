//! Grade Predictor CLI
//!
//! A command-line tool for checking the prediction server, listing the
//! course schemas and requesting S5-S6 grade predictions.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{courses, model, predict};
use std::path::PathBuf;

/// Grade Predictor CLI
#[derive(Parser)]
#[command(name = "gp")]
#[command(author, version, about = "CLI for the Grade Predictor API", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via GP_API_URL env var or ~/.config/gp/config.json)
    #[arg(long, env = "GP_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check server health and model status
    Health,

    /// Show the loaded model and its training metrics
    Info,

    /// List the model's input or output course codes
    Courses {
        /// Which course list to show
        #[arg(value_enum)]
        set: courses::CourseSet,
    },

    /// Predict S5-S6 grades from known S1-S4 grades
    Predict {
        /// Known grade as CODE=GRADE (repeatable)
        #[arg(long = "grade", short, value_name = "CODE=GRADE")]
        grades: Vec<String>,

        /// JSON file with grades, either {"CODE": GRADE} or {"grades": {...}}
        #[arg(long)]
        file: Option<PathBuf>,

        /// Grade to send for every input course not given
        #[arg(long, value_name = "GRADE")]
        fill: Option<f64>,
    },

    /// Reload the model on the server
    Reload,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let client = client::ApiClient::new(&config.api_url(cli.api_url))?;

    match cli.command {
        Commands::Health => model::show_health(&client, cli.format).await?,
        Commands::Info => model::show_info(&client, cli.format).await?,
        Commands::Courses { set } => courses::list_courses(&client, set, cli.format).await?,
        Commands::Predict { grades, file, fill } => {
            predict::predict(&client, &grades, file.as_deref(), fill, cli.format).await?
        }
        Commands::Reload => model::reload(&client, cli.format).await?,
    }

    Ok(())
}
