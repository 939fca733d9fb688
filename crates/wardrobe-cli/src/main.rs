//! Wardrobe CLI - check wardrobe images from the command line
//!
//! Runs the same ingest rules as the upload form against files on disk and
//! optionally asks the validation endpoint for a second opinion.

mod cli;
mod commands;
mod error;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::inspect::run_inspect;
use crate::commands::validate::run_validate;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wardrobe=warn".parse().expect("valid directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect {
            path,
            json,
            max_bytes,
        } => run_inspect(&path, json, max_bytes)?,
        Commands::Validate {
            path,
            api_url,
            max_bytes,
        } => run_validate(&path, api_url, max_bytes).await?,
    }

    Ok(())
}
