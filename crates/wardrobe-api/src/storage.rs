use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use uuid::Uuid;

use crate::config::{AppConfig, StorageConfig};
use crate::error::AppError;
use crate::validation::extension_for;

const UPLOAD_PREFIX: &str = "uploads";

/// An object written to the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

#[derive(Clone)]
pub struct ObjectStorage {
    bucket: String,
    public_base_url: String,
    client: Client,
}

impl ObjectStorage {
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        config.storage.clone().map(Self::new)
    }

    pub fn new(config: StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "wardrobe-api-storage",
        );

        let shared_config = aws_sdk_s3::Config::builder()
            .region(Region::new(config.region))
            .endpoint_url(config.endpoint_url)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            bucket: config.bucket,
            public_base_url: config.public_base_url,
            client: Client::from_conf(shared_config),
        }
    }

    /// Write an accepted upload under a fresh `uploads/<uuid>.<ext>` key.
    pub async fn put_upload(&self, mime_type: &str, bytes: Vec<u8>) -> Result<StoredObject, AppError> {
        let key = upload_key(mime_type);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(mime_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|error| {
                AppError::external(format!("Failed to store upload: {}", sanitize(&error)))
            })?;
        Ok(StoredObject {
            url: public_url(&self.public_base_url, &key)?,
            key,
        })
    }
}

fn upload_key(mime_type: &str) -> String {
    format!(
        "{UPLOAD_PREFIX}/{}.{}",
        Uuid::now_v7().simple(),
        extension_for(mime_type)
    )
}

fn public_url(base_url: &str, key: &str) -> Result<String, AppError> {
    let key = normalize_object_key(key)?;
    Ok(format!("{}/{key}", base_url.trim_end_matches('/')))
}

fn normalize_object_key(raw: &str) -> Result<String, AppError> {
    let key = raw.trim().trim_start_matches('/').to_string();
    if key.is_empty() {
        return Err(AppError::internal("object key is empty"));
    }
    if key.contains("..") {
        return Err(AppError::internal(
            "object key must not contain path traversal segments",
        ));
    }
    Ok(key)
}

fn sanitize(error: &impl std::fmt::Display) -> String {
    error.to_string().replace('\n', " ").trim().to_string()
}
