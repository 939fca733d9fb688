use std::io;

use thiserror::Error;
use wardrobe_core::config::ConfigError;
use wardrobe_core::ingest::ValidationError;
use wardrobe_core::media::ApiClientError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Rejected(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Could not read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Size ceiling must be greater than zero")]
    ZeroMaxBytes,
    #[error(
        "Validation API is not configured. Pass --api-url or set WARDROBE_API_BASE_URL."
    )]
    ApiNotConfigured,
}
