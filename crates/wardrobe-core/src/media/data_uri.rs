//! Self-describing `data:<mime>;base64,<payload>` image encoding.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUriError {
    #[error("value is not a base64 data URI")]
    Malformed,
    #[error("media type {0} is not an image type")]
    NotImage(String),
    #[error("payload is not valid base64: {0}")]
    InvalidPayload(String),
}

fn data_uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:([a-zA-Z]+/[a-zA-Z0-9.+-]+);base64,([A-Za-z0-9+/]+={0,2})$")
            .expect("Invalid regex")
    })
}

/// An image payload encoded as a data URI, suitable for inline storage and display.
///
/// The media type is always an `image/*` type and is stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EncodedImage {
    uri: String,
    mime_len: usize,
}

impl EncodedImage {
    /// Encode raw image bytes under the given media type.
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Result<Self, DataUriError> {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(DataUriError::NotImage(mime_type));
        }
        let uri = format!("data:{mime_type};base64,{}", BASE64_STANDARD.encode(bytes));
        Ok(Self {
            mime_len: mime_type.len(),
            uri,
        })
    }

    /// Parse a data URI, requiring an image media type and a base64 payload.
    pub fn parse(raw: &str) -> Result<Self, DataUriError> {
        let captures = data_uri_pattern()
            .captures(raw.trim())
            .ok_or(DataUriError::Malformed)?;
        let mime_type = captures[1].to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(DataUriError::NotImage(mime_type));
        }
        let uri = format!("data:{mime_type};base64,{}", &captures[2]);
        Ok(Self {
            mime_len: mime_type.len(),
            uri,
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.uri[5..5 + self.mime_len]
    }

    /// The base64 payload without the `data:...;base64,` prefix.
    pub fn payload(&self) -> &str {
        &self.uri[5 + self.mime_len + ";base64,".len()..]
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Decoded size estimated from the payload length, `ceil(len * 3 / 4)`.
    pub fn approx_decoded_len(&self) -> u64 {
        (self.payload().len() as u64 * 3).div_ceil(4)
    }

    pub fn decode(&self) -> Result<Vec<u8>, DataUriError> {
        BASE64_STANDARD
            .decode(self.payload())
            .map_err(|error| DataUriError::InvalidPayload(error.to_string()))
    }
}

impl fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl FromStr for EncodedImage {
    type Err = DataUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EncodedImage {
    type Error = DataUriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EncodedImage> for String {
    fn from(value: EncodedImage) -> Self {
        value.uri
    }
}
