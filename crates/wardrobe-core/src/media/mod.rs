//! Image encoding and the validation endpoint client.

mod client;
mod data_uri;

pub use client::{ApiClientError, ImageMetadata, ValidationApiClient};
pub use data_uri::{DataUriError, EncodedImage};
