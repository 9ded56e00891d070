//! CLI frontend for the status effect engine.

mod commands;
mod scenario;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(
    name = "fx",
    about = "Validate status effect definitions and run effect scenarios",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an effect definition file
    Check {
        /// JSON file with effect definitions
        definitions: PathBuf,
    },

    /// Run a scripted scenario against a set of definitions
    Run {
        /// JSON file with effect definitions
        definitions: PathBuf,

        /// JSON scenario file
        scenario: PathBuf,

        /// Override the number of ticks to run
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Print the final effect records as JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Show the full lifecycle log and alert commands
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { definitions } => commands::check::run(&definitions),
        Commands::Run {
            definitions,
            scenario,
            ticks,
            json,
            verbose,
        } => commands::run::run(&definitions, &scenario, ticks, json, verbose),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
