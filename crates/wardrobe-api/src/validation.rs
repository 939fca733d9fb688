//! Acceptance rules shared by the validate and upload routes.

use wardrobe_core::media::{DataUriError, EncodedImage, ImageMetadata};

use crate::config::AppConfig;
use crate::error::AppError;

const MISSING_IMAGE: &str =
    "Bad Request. The 'image' field with a Base64 string is required in the JSON body.";
const INVALID_FORMAT: &str = "Invalid format. The 'image' string must be a valid data URI (e.g., 'data:image/jpeg;base64,...').";

/// Allowed image types and the size ceiling applied to every submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePolicy {
    allowed_types: Vec<String>,
    max_bytes: u64,
}

impl ImagePolicy {
    pub fn new(allowed_types: Vec<String>, max_bytes: u64) -> Self {
        Self {
            allowed_types,
            max_bytes,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.allowed_image_types.clone(), config.max_image_bytes)
    }

    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Validate a `data:<mime>;base64,<payload>` string from a JSON body.
    ///
    /// The size is estimated from the payload length without decoding it.
    pub fn check_data_uri(&self, raw: Option<&str>) -> Result<ImageMetadata, AppError> {
        let raw = raw
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::bad_request(MISSING_IMAGE))?;
        let image = EncodedImage::parse(raw).map_err(|error| match error {
            DataUriError::NotImage(mime_type) => unsupported(&mime_type),
            DataUriError::Malformed | DataUriError::InvalidPayload(_) => {
                AppError::bad_request(INVALID_FORMAT)
            }
        })?;
        self.check(image.mime_type(), image.approx_decoded_len())
    }

    /// Validate an uploaded file by its declared type and exact size.
    pub fn check_upload(&self, mime_type: &str, size_in_bytes: u64) -> Result<ImageMetadata, AppError> {
        if size_in_bytes == 0 {
            return Err(AppError::bad_request("Bad Request. The uploaded file is empty."));
        }
        self.check(&mime_type.trim().to_ascii_lowercase(), size_in_bytes)
    }

    fn check(&self, mime_type: &str, size_in_bytes: u64) -> Result<ImageMetadata, AppError> {
        if !self.allowed_types.iter().any(|allowed| allowed == mime_type) {
            return Err(unsupported(mime_type));
        }
        if size_in_bytes > self.max_bytes {
            return Err(AppError::bad_request(format!(
                "Image size exceeds the {} limit.",
                describe_limit(self.max_bytes)
            )));
        }
        Ok(ImageMetadata {
            mime_type: mime_type.to_string(),
            size_in_bytes,
        })
    }

    fn allowed_summary(&self) -> String {
        self.allowed_types
            .iter()
            .map(|mime_type| short_name(mime_type))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn unsupported(mime_type: &str) -> AppError {
    AppError::bad_request(format!("Unsupported image format. Found: {mime_type}"))
}

fn short_name(mime_type: &str) -> String {
    let subtype = mime_type.strip_prefix("image/").unwrap_or(mime_type);
    subtype
        .split('+')
        .next()
        .unwrap_or(subtype)
        .to_ascii_uppercase()
}

fn describe_limit(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} byte")
    }
}

/// File extension used for stored objects of `mime_type`.
pub fn extension_for(mime_type: &str) -> &str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/svg+xml" => "svg",
        other => other
            .strip_prefix("image/")
            .filter(|subtype| subtype.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin"),
    }
}

impl std::fmt::Display for ImagePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} up to {}",
            self.allowed_summary(),
            describe_limit(self.max_bytes)
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn policy() -> ImagePolicy {
        ImagePolicy::new(
            ["image/jpeg", "image/png", "image/svg+xml", "image/webp", "image/avif"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            10 * 1024 * 1024,
        )
    }

    #[test]
    fn accepts_allowed_data_uri_and_estimates_size() {
        let metadata = policy()
            .check_data_uri(Some("data:image/png;base64,iVBORw0KGgo="))
            .unwrap();
        assert_eq!(
            metadata,
            ImageMetadata {
                mime_type: "image/png".to_string(),
                size_in_bytes: 9,
            }
        );
    }

    #[test]
    fn svg_subtype_with_plus_is_accepted() {
        let metadata = policy()
            .check_data_uri(Some("data:image/svg+xml;base64,PHN2Zz4="))
            .unwrap();
        assert_eq!(metadata.mime_type, "image/svg+xml");
    }

    #[test]
    fn missing_or_malformed_image_is_rejected() {
        let missing = policy().check_data_uri(None).unwrap_err();
        assert!(missing.to_string().contains("'image' field"));

        let malformed = policy().check_data_uri(Some("not a data uri")).unwrap_err();
        assert!(malformed.to_string().starts_with("Invalid format."));
    }

    #[test]
    fn unsupported_type_is_rejected() {
        let gif = policy()
            .check_data_uri(Some("data:image/gif;base64,R0lGODlh"))
            .unwrap_err();
        assert_eq!(gif.to_string(), "Unsupported image format. Found: image/gif");

        let text = policy()
            .check_data_uri(Some("data:text/plain;base64,aGk="))
            .unwrap_err();
        assert!(text.to_string().contains("text/plain"));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let small = ImagePolicy::new(vec!["image/png".to_string()], 3);
        assert!(small.check_data_uri(Some("data:image/png;base64,AAAA")).is_ok());
        let error = small
            .check_data_uri(Some("data:image/png;base64,AAAAAA=="))
            .unwrap_err();
        assert_eq!(error.to_string(), "Image size exceeds the 3 byte limit.");

        let error = policy().check_upload("image/png", 10 * 1024 * 1024 + 1).unwrap_err();
        assert_eq!(error.to_string(), "Image size exceeds the 10MB limit.");
    }

    #[test]
    fn upload_checks_type_and_emptiness() {
        assert!(policy().check_upload("image/JPEG", 0).is_err());
        let metadata = policy().check_upload("image/JPEG", 1_024).unwrap();
        assert_eq!(metadata.mime_type, "image/jpeg");
        assert!(policy().check_upload("application/pdf", 1_024).is_err());
    }

    #[test]
    fn extensions_for_stored_objects() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/svg+xml"), "svg");
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("image/x.weird"), "bin");
    }

    #[test]
    fn display_summarises_policy() {
        assert_eq!(
            policy().to_string(),
            "JPEG, PNG, SVG, WEBP, AVIF up to 10MB"
        );
    }
}
