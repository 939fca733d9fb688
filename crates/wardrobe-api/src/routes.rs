use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wardrobe_core::media::ImageMetadata;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::storage::ObjectStorage;
use crate::validation::ImagePolicy;

const FILE_FIELD: &str = "file";
const VALIDATED_MESSAGE: &str = "Image received and validated successfully.";
const UPLOADED_MESSAGE: &str = "Image uploaded successfully.";
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    policy: Arc<ImagePolicy>,
    storage: Option<Arc<ObjectStorage>>,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        Self {
            policy: Arc::new(ImagePolicy::from_config(&config)),
            storage: ObjectStorage::from_config(&config).map(Arc::new),
            config,
        }
    }

    pub fn policy(&self) -> &ImagePolicy {
        &self.policy
    }
}

pub fn app_router(state: AppState) -> Router {
    let body_limit = body_limit(state.policy.max_bytes());

    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/v1/images/validate",
            post(validate_image).fallback(method_not_allowed),
        )
        .route("/uploadImage", post(validate_image).fallback(method_not_allowed))
        .route(
            "/v1/images/upload",
            post(upload_image).fallback(method_not_allowed),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

/// Request body ceiling: a base64 payload of the largest accepted image plus
/// room for the surrounding JSON or multipart framing.
fn body_limit(max_image_bytes: u64) -> usize {
    let encoded = max_image_bytes.saturating_mul(4).div_ceil(3);
    usize::try_from(encoded.saturating_add(64 * 1024)).unwrap_or(usize::MAX)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    image: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ValidateResponse {
    success: bool,
    message: &'static str,
    metadata: ImageMetadata,
}

async fn validate_image(
    State(state): State<AppState>,
    request: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateResponse>, AppError> {
    let image = request.ok().and_then(|Json(request)| request.image);
    let metadata = state
        .policy
        .check_data_uri(image.as_ref().and_then(Value::as_str))
        .inspect_err(|error| tracing::info!(endpoint = "validate_image", "Rejected image: {error}"))?;
    tracing::info!(
        endpoint = "validate_image",
        mime_type = %metadata.mime_type,
        size_in_bytes = metadata.size_in_bytes,
        "Validated image"
    );
    Ok(Json(ValidateResponse {
        success: true,
        message: VALIDATED_MESSAGE,
        metadata,
    }))
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    message: &'static str,
    url: String,
    metadata: ImageMetadata,
}

#[derive(Debug)]
struct UploadedFile {
    mime_type: Option<String>,
    bytes: Vec<u8>,
}

async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let storage = state.storage.as_ref().ok_or_else(|| {
        AppError::Config("Object storage is not configured on the backend".to_string())
    })?;
    let file = read_file_field(multipart).await?;
    let mime_type = file
        .mime_type
        .ok_or_else(|| AppError::bad_request("Bad Request. Could not determine the file type."))?;
    let metadata = state
        .policy
        .check_upload(&mime_type, file.bytes.len() as u64)?;

    let stored = storage.put_upload(&metadata.mime_type, file.bytes).await?;
    tracing::info!(
        endpoint = "upload_image",
        mime_type = %metadata.mime_type,
        size_in_bytes = metadata.size_in_bytes,
        object_key = %stored.key,
        "Stored uploaded image"
    );
    Ok(Json(UploadResponse {
        success: true,
        message: UPLOADED_MESSAGE,
        url: stored.url,
        metadata,
    }))
}

async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::bad_request(format!("Invalid multipart body: {error}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let mime_type = resolve_mime_type(field.content_type(), field.file_name());
        let bytes = field
            .bytes()
            .await
            .map_err(|error| AppError::bad_request(format!("Invalid multipart body: {error}")))?;
        return Ok(UploadedFile {
            mime_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(AppError::bad_request(
        "Bad Request. A 'file' field is required in the multipart body.",
    ))
}

/// Declared part type, or a guess from the file name when the client sent
/// none or a generic one.
fn resolve_mime_type(content_type: Option<&str>, file_name: Option<&str>) -> Option<String> {
    content_type
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case(OCTET_STREAM))
        .map(str::to_ascii_lowercase)
        .or_else(|| {
            file_name
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .map(ToString::to_string)
        })
}
