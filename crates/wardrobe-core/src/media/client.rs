//! HTTP client for the image validation endpoint.
//!
//! Posts an encoded image to `wardrobe-api` and returns the metadata the
//! endpoint echoes back, so clients can run the server-side check before
//! persisting an item.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::EncodedImage;
use crate::util::{compact_text, is_http_url};

const VALIDATE_ROUTE: &str = "/v1/images/validate";

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Validation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Image rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Metadata returned for an accepted image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub mime_type: String,
    pub size_in_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ValidateResponse {
    message: Option<String>,
    metadata: ImageMetadata,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// HTTP client for the validation endpoint served by `wardrobe-api`.
#[derive(Debug, Clone)]
pub struct ValidationApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ValidationApiClient {
    /// Builds a client for an explicit API base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiClientError> {
        let base_url = normalize_base_url(base_url.into().as_str())?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base_url, client })
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submits the image for server-side validation.
    pub async fn validate(&self, image: &EncodedImage) -> Result<ImageMetadata, ApiClientError> {
        let response = self
            .client
            .post(format!("{}{VALIDATE_ROUTE}", self.base_url))
            .header("Accept", "application/json")
            .json(&serde_json::json!({ "image": image.as_str() }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiClientError::Rejected {
                status: status.as_u16(),
                message: parse_api_error(status, &body),
            });
        }

        let payload = response.json::<ValidateResponse>().await?;
        if let Some(message) = payload.message.as_deref() {
            tracing::debug!("Validation endpoint accepted image: {}", message);
        }
        Ok(payload.metadata)
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return message.trim().to_string();
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ApiClientError> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(ApiClientError::InvalidConfiguration(
            "API base URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(&base) {
        return Err(ApiClientError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(base)
}
