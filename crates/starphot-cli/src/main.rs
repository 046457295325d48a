mod commands;
mod csv_io;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "starphot", about = "Star tracking and aperture photometry tool")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show image folder metadata
    Info(commands::info::InfoArgs),
    /// Pre-select star positions across all frames
    Track(commands::track::TrackArgs),
    /// Measure frames from a saved positions file
    Measure(commands::measure::MeasureArgs),
    /// Pre-select positions and measure in one go
    Run(commands::run::RunArgs),
    /// Print or save the default session config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Track(args) => commands::track::run(args),
        Commands::Measure(args) => commands::measure::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
