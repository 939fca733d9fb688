//! Client configuration.
//!
//! Values come from an optional JSON document and are then overridden by
//! `WARDROBE_*` environment variables.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::{
    ceiling_for_document_limit, DEFAULT_SAFETY_MARGIN_BYTES, DEFAULT_STORE_DOCUMENT_LIMIT_BYTES,
    MAX_STORE_DOCUMENT_LIMIT_BYTES,
};
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_STATUS_AUTO_CLEAR_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Per-document size ceiling of the backing store
    pub store_document_limit_bytes: u64,
    pub image_safety_margin_bytes: u64,
    /// Explicit upload ceiling; derived from the document limit when unset
    pub max_image_bytes: Option<u64>,
    pub status_auto_clear_secs: u64,
    pub validation_api_base_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store_document_limit_bytes: DEFAULT_STORE_DOCUMENT_LIMIT_BYTES,
            image_safety_margin_bytes: DEFAULT_SAFETY_MARGIN_BYTES,
            max_image_bytes: None,
            status_auto_clear_secs: DEFAULT_STATUS_AUTO_CLEAR_SECS,
            validation_api_base_url: None,
        }
    }
}

impl ClientConfig {
    /// Largest original image file accepted by the upload form.
    pub fn max_image_bytes(&self) -> u64 {
        self.max_image_bytes.unwrap_or_else(|| self.derived_ceiling())
    }

    fn derived_ceiling(&self) -> u64 {
        ceiling_for_document_limit(
            self.store_document_limit_bytes,
            self.image_safety_margin_bytes,
        )
    }

    pub const fn status_auto_clear(&self) -> Duration {
        Duration::from_secs(self.status_auto_clear_secs)
    }

    /// Parse a JSON config document.
    pub fn parse(payload: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(payload)?;
        config.validated()
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = std::env::vars().collect();
        Self::default().with_overrides(|name| values.get(name).cloned())
    }

    /// Apply `WARDROBE_*` overrides from `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = parse_u64(&lookup, "WARDROBE_STORE_DOCUMENT_LIMIT_BYTES")? {
            self.store_document_limit_bytes = value;
        }
        if let Some(value) = parse_u64(&lookup, "WARDROBE_MAX_IMAGE_BYTES")? {
            self.max_image_bytes = Some(value);
        }
        if let Some(value) = parse_u64(&lookup, "WARDROBE_STATUS_AUTO_CLEAR_SECS")? {
            self.status_auto_clear_secs = value;
        }
        if let Some(url) = normalize_text_option(lookup("WARDROBE_API_BASE_URL")) {
            self.validation_api_base_url = Some(url);
        }
        self.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.validation_api_base_url = normalize_text_option(self.validation_api_base_url)
            .map(|url| url.trim_end_matches('/').to_string());
        if let Some(url) = self.validation_api_base_url.as_deref() {
            if !is_http_url(url) {
                return Err(ConfigError::Invalid(
                    "validation_api_base_url must include http:// or https://".to_string(),
                ));
            }
        }

        if self.store_document_limit_bytes > MAX_STORE_DOCUMENT_LIMIT_BYTES {
            return Err(ConfigError::Invalid(format!(
                "store_document_limit_bytes must not exceed {MAX_STORE_DOCUMENT_LIMIT_BYTES}"
            )));
        }
        let ceiling = self.derived_ceiling();
        if ceiling == 0 {
            return Err(ConfigError::Invalid(
                "store_document_limit_bytes leaves no room for an image".to_string(),
            ));
        }
        match self.max_image_bytes {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "max_image_bytes must be greater than zero".to_string(),
                ))
            }
            Some(max) if max > ceiling => {
                return Err(ConfigError::Invalid(format!(
                    "max_image_bytes ({max}) exceeds what fits in one document ({ceiling})"
                )))
            }
            _ => {}
        }

        if !(1..=60).contains(&self.status_auto_clear_secs) {
            return Err(ConfigError::Invalid(
                "status_auto_clear_secs must be in [1, 60]".to_string(),
            ));
        }
        Ok(self)
    }
}

fn parse_u64(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<u64>, ConfigError> {
    normalize_text_option(lookup(name))
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid(format!("{name} must be a non-negative integer")))
        })
        .transpose()
}
