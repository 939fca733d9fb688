use std::collections::HashMap;
use std::env;
use std::fmt;

use thiserror::Error;
use wardrobe_core::util::{is_http_url, normalize_text_option};

const DEFAULT_ALLOWED_IMAGE_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/svg+xml",
    "image/webp",
    "image/avif",
];
const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_IMAGE_BYTES_LIMIT: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub allowed_image_types: Vec<String>,
    pub max_image_bytes: u64,
    pub storage: Option<StorageConfig>,
}

/// S3-compatible bucket that accepted uploads are written to.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub endpoint_url: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub public_base_url: String,
    pub region: String,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("StorageConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("public_base_url", &self.public_base_url)
            .field("region", &self.region)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "WARDROBE_API_BIND_ADDR", "127.0.0.1:8080");

        let allowed_image_types = optional_trimmed(&lookup, "WARDROBE_ALLOWED_IMAGE_TYPES")
            .map_or_else(
                || {
                    DEFAULT_ALLOWED_IMAGE_TYPES
                        .iter()
                        .map(ToString::to_string)
                        .collect()
                },
                |raw| parse_image_types(&raw),
            );
        if allowed_image_types.is_empty() {
            return Err(ConfigError::Invalid(
                "WARDROBE_ALLOWED_IMAGE_TYPES must list at least one type".to_string(),
            ));
        }
        if let Some(bad) = allowed_image_types
            .iter()
            .find(|value| !value.starts_with("image/"))
        {
            return Err(ConfigError::Invalid(format!(
                "WARDROBE_ALLOWED_IMAGE_TYPES entry {bad} is not an image type"
            )));
        }

        let max_image_bytes = match optional_trimmed(&lookup, "WARDROBE_MAX_IMAGE_BYTES") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!(
                    "WARDROBE_MAX_IMAGE_BYTES must be an integer in [1, {MAX_IMAGE_BYTES_LIMIT}]"
                ))
            })?,
            None => DEFAULT_MAX_IMAGE_BYTES,
        };
        if !(1..=MAX_IMAGE_BYTES_LIMIT).contains(&max_image_bytes) {
            return Err(ConfigError::Invalid(format!(
                "WARDROBE_MAX_IMAGE_BYTES must be in [1, {MAX_IMAGE_BYTES_LIMIT}]"
            )));
        }

        let storage = parse_storage_config(&lookup)?;

        Ok(Self {
            bind_addr,
            allowed_image_types,
            max_image_bytes,
            storage,
        })
    }
}

fn parse_image_types(raw: &str) -> Vec<String> {
    let mut types: Vec<String> = raw
        .split(',')
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .collect();
    types.dedup();
    types
}

fn parse_storage_config(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<StorageConfig>, ConfigError> {
    let endpoint_url = optional_trimmed(&lookup, "STORAGE_ENDPOINT_URL");
    let bucket = optional_trimmed(&lookup, "STORAGE_BUCKET");
    let access_key_id = optional_trimmed(&lookup, "STORAGE_ACCESS_KEY_ID");
    let secret_access_key = optional_trimmed(&lookup, "STORAGE_SECRET_ACCESS_KEY");
    let public_base_url = optional_trimmed(&lookup, "STORAGE_PUBLIC_BASE_URL");

    let any_set = endpoint_url.is_some()
        || bucket.is_some()
        || access_key_id.is_some()
        || secret_access_key.is_some()
        || public_base_url.is_some();
    if !any_set {
        return Ok(None);
    }

    let endpoint_url = endpoint_url.ok_or(ConfigError::MissingVar("STORAGE_ENDPOINT_URL"))?;
    let bucket = bucket.ok_or(ConfigError::MissingVar("STORAGE_BUCKET"))?;
    let access_key_id = access_key_id.ok_or(ConfigError::MissingVar("STORAGE_ACCESS_KEY_ID"))?;
    let secret_access_key =
        secret_access_key.ok_or(ConfigError::MissingVar("STORAGE_SECRET_ACCESS_KEY"))?;
    let public_base_url =
        public_base_url.ok_or(ConfigError::MissingVar("STORAGE_PUBLIC_BASE_URL"))?;

    for (name, url) in [
        ("STORAGE_ENDPOINT_URL", &endpoint_url),
        ("STORAGE_PUBLIC_BASE_URL", &public_base_url),
    ] {
        if !is_http_url(url) {
            return Err(ConfigError::Invalid(format!(
                "{name} must start with http:// or https://"
            )));
        }
    }

    Ok(Some(StorageConfig {
        endpoint_url: trim_trailing(&endpoint_url).to_string(),
        bucket,
        access_key_id,
        secret_access_key,
        public_base_url: trim_trailing(&public_base_url).to_string(),
        region: value_or_default(&lookup, "STORAGE_REGION", "auto"),
    }))
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    normalize_text_option(lookup(name))
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches('/')
}
