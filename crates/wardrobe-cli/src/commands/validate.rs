use std::path::Path;

use wardrobe_core::media::ValidationApiClient;
use wardrobe_core::ClientConfig;

use crate::commands::common::{ingest_file, load_config, resolve_max_bytes};
use crate::error::CliError;

pub async fn run_validate(
    path: &Path,
    api_url: Option<String>,
    max_bytes: Option<u64>,
) -> Result<(), CliError> {
    let config = load_config()?;
    let max_bytes = resolve_max_bytes(max_bytes, &config)?;
    let api_url = resolve_api_url(api_url, &config)?;

    let pending = ingest_file(path, max_bytes)?;
    println!("{}", pending.description());

    let client = ValidationApiClient::new(api_url)?;
    tracing::info!("Submitting {} to {}", pending.file_name, client.base_url());
    let metadata = client.validate(&pending.image).await?;
    println!(
        "accepted: {} ({} bytes)",
        metadata.mime_type, metadata.size_in_bytes
    );
    Ok(())
}

/// `--api-url` wins over the configured base URL.
pub fn resolve_api_url(explicit: Option<String>, config: &ClientConfig) -> Result<String, CliError> {
    explicit
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| config.validation_api_base_url.clone())
        .ok_or(CliError::ApiNotConfigured)
}
