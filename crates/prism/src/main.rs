//! Prism CLI - modular image analysis from the command line.
//!
//! Prism runs a set of independent analysis modules (texture, histograms,
//! equalization, thresholding, edges) against each image and prints one
//! consolidated report per image.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a single image
//! prism analyze photo.png
//!
//! # Analyze several images, one JSON line each
//! prism analyze a.png b.jpg --format jsonl --output reports.jsonl
//!
//! # List the registered modules
//! prism modules list
//!
//! # View configuration
//! prism config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Prism - modular image analysis pipeline.
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every analysis module against one or more images
    Analyze(cli::analyze::AnalyzeArgs),

    /// Inspect the analysis modules
    Modules(cli::modules::ModulesArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config problems go straight to stderr.
    let config = match prism_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `prism config path`."
            );
            prism_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Prism v{}", prism_core::VERSION);

    match cli.command {
        Commands::Analyze(args) => cli::analyze::execute(args, config).await,
        Commands::Modules(args) => cli::modules::execute(args, &config),
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
