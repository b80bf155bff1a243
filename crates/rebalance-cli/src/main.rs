mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::rebalance::{ForecastArgs, ProjectArgs, RebalanceArgs, ReferenceArgs};

/// Rebalance allocation targets after partial progress
#[derive(Parser)]
#[command(
    name = "rebal",
    version,
    about = "Rebalance allocation targets after partial progress",
    long_about = "Computes new per-category targets for the remaining part of an allocation \
                  horizon so the final shares land as close as possible to the original \
                  targets, while every category stays inside its bounds and the targets \
                  keep their fixed total."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Full rebalance: catch-up reference, bounded projection and forecast
    Rebalance(RebalanceArgs),
    /// Unconstrained catch-up targets for the remaining period
    Reference(ReferenceArgs),
    /// Project any vector onto per-category bounds with a fixed total
    Project(ProjectArgs),
    /// End-of-horizon shares for a given set of new targets
    Forecast(ForecastArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Rebalance(args) => commands::rebalance::run_rebalance(args),
        Commands::Reference(args) => commands::rebalance::run_reference(args),
        Commands::Project(args) => commands::rebalance::run_project(args),
        Commands::Forecast(args) => commands::rebalance::run_forecast(args),
        Commands::Version => {
            println!("rebal {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
