//! Error types for wardrobe-core

use thiserror::Error;

use crate::auth::AuthError;
use crate::form::FormError;
use crate::ingest::ValidationError;
use crate::store::StoreError;

/// Result type alias using wardrobe-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wardrobe-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected file selection
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Submission precondition failed
    #[error(transparent)]
    Form(#[from] FormError),

    /// Backing store rejected or failed an operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Identity provider failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
