use std::path::Path;

use serde::Serialize;
use wardrobe_core::ingest::{ImageIngest, PendingImage, SelectedFile};
use wardrobe_core::ClientConfig;

use crate::error::CliError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct InspectReport {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub max_bytes: u64,
    pub description: String,
}

impl InspectReport {
    pub fn new(pending: &PendingImage, max_bytes: u64) -> Self {
        Self {
            file_name: pending.file_name.clone(),
            mime_type: pending.image.mime_type().to_string(),
            size_bytes: pending.size_bytes,
            max_bytes,
            description: pending.description(),
        }
    }
}

pub fn load_config() -> Result<ClientConfig, CliError> {
    Ok(ClientConfig::from_env()?)
}

/// Explicit override, else the configured ceiling.
pub fn resolve_max_bytes(
    explicit: Option<u64>,
    config: &ClientConfig,
) -> Result<u64, CliError> {
    match explicit {
        Some(0) => Err(CliError::ZeroMaxBytes),
        Some(max_bytes) => Ok(max_bytes),
        None => Ok(config.max_image_bytes()),
    }
}

/// Read `path` and run it through the ingest rules.
pub fn ingest_file(path: &Path, max_bytes: u64) -> Result<PendingImage, CliError> {
    let file = SelectedFile::from_path(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut ingest = ImageIngest::new(max_bytes);
    let pending = ingest.select(file)?.clone();
    Ok(pending)
}

pub fn format_report_lines(report: &InspectReport) -> Vec<String> {
    vec![
        report.description.clone(),
        format!("type: {}", report.mime_type),
        format!("limit: {} KB", report.max_bytes / 1024),
    ]
}
