//! Image selection, validation and encoding for the upload form.

use std::path::Path;

use thiserror::Error;

use crate::media::{DataUriError, EncodedImage};
use crate::util::{format_kib, format_kib_limit};

/// Per-document size ceiling of the backing store.
pub const DEFAULT_STORE_DOCUMENT_LIMIT_BYTES: u64 = 1024 * 1024;
/// Largest document limit a configuration may declare (64 MiB).
pub const MAX_STORE_DOCUMENT_LIMIT_BYTES: u64 = 64 * 1024 * 1024;
/// Headroom kept below the derived ceiling for the other document fields.
pub const DEFAULT_SAFETY_MARGIN_BYTES: u64 = 18_628;
/// Largest original file accepted by default (750 KiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 750 * 1024;

/// Largest original file whose base64 form still fits in one document.
///
/// `floor(document_limit / 1.333) - safety_margin`, saturating at zero.
/// Limits too large to scale saturate instead of wrapping.
pub const fn ceiling_for_document_limit(document_limit: u64, safety_margin: u64) -> u64 {
    (document_limit.saturating_mul(1000) / 1333).saturating_sub(safety_margin)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid file. Please choose an image (got {mime_type}).")]
    InvalidType { mime_type: String },
    #[error(
        "File size ({} KB) exceeds the {} KB limit.",
        format_kib(*size_bytes),
        format_kib_limit(*max_bytes)
    )]
    TooLarge { size_bytes: u64, max_bytes: u64 },
    #[error("The selected file is empty.")]
    EmptyFile,
}

/// A file chosen by the user, as reported by the host file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, classifying it by extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(String::new, |name| name.to_string_lossy().to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self {
            name,
            mime_type,
            bytes,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A validated image waiting to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub file_name: String,
    pub size_bytes: u64,
    pub image: EncodedImage,
}

impl PendingImage {
    /// `"<name> | <size> KB"` line shown under the preview.
    pub fn description(&self) -> String {
        format!("{} | {} KB", self.file_name, format_kib(self.size_bytes))
    }

    /// Source for the preview element.
    pub fn preview_src(&self) -> &str {
        self.image.as_str()
    }
}

/// Holds the single pending-image slot of a form session.
#[derive(Debug, Clone)]
pub struct ImageIngest {
    max_bytes: u64,
    pending: Option<PendingImage>,
}

impl Default for ImageIngest {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IMAGE_BYTES)
    }
}

impl ImageIngest {
    pub const fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            pending: None,
        }
    }

    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Validate and encode `file`, replacing the pending image on success.
    ///
    /// A rejected file leaves the current pending image untouched.
    pub fn select(&mut self, file: SelectedFile) -> Result<&PendingImage, ValidationError> {
        let pending = self.encode(file)?;
        tracing::debug!(
            "Accepted image {} ({} bytes)",
            pending.file_name,
            pending.size_bytes
        );
        Ok(self.pending.insert(pending))
    }

    fn encode(&self, file: SelectedFile) -> Result<PendingImage, ValidationError> {
        let mime_type = file.mime_type.trim().to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(ValidationError::InvalidType { mime_type });
        }
        let size_bytes = file.size_bytes();
        if size_bytes > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size_bytes,
                max_bytes: self.max_bytes,
            });
        }
        if size_bytes == 0 {
            return Err(ValidationError::EmptyFile);
        }
        let image = EncodedImage::encode(&mime_type, &file.bytes).map_err(|error| match error {
            DataUriError::NotImage(mime_type) => ValidationError::InvalidType { mime_type },
            DataUriError::Malformed | DataUriError::InvalidPayload(_) => {
                ValidationError::InvalidType {
                    mime_type: mime_type.clone(),
                }
            }
        })?;
        Ok(PendingImage {
            file_name: file.name,
            size_bytes,
            image,
        })
    }

    pub const fn pending(&self) -> Option<&PendingImage> {
        self.pending.as_ref()
    }

    /// Return to the empty state.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}
