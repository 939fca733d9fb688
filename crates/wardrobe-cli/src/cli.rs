use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wardrobe")]
#[command(about = "Check wardrobe photos before they are catalogued")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the upload form's image checks against a file
    Inspect {
        /// Image file to check
        path: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Override the size ceiling in bytes
        #[arg(long, value_name = "BYTES")]
        max_bytes: Option<u64>,
    },
    /// Check a file locally, then submit it to the validation endpoint
    Validate {
        /// Image file to check
        path: PathBuf,
        /// Validation API base URL (defaults to WARDROBE_API_BASE_URL)
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// Override the size ceiling in bytes
        #[arg(long, value_name = "BYTES")]
        max_bytes: Option<u64>,
    },
}
