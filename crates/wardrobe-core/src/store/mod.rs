//! Remote item collection boundary.
//!
//! Every operation is scoped by an owner identifier. Live views are
//! delivered through a [`Subscription`]: an initial snapshot is queued
//! immediately and a fresh snapshot follows every add or remove in scope.

mod memory;

use std::fmt;
use std::future::Future;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::media::EncodedImage;
use crate::models::{ItemId, WardrobeItem};

pub use memory::{MemoryItemStore, StoreOperation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Access denied by the store's access policy")]
    PermissionDenied,
    #[error("Store is unavailable")]
    Unavailable,
    #[error("Item not found")]
    NotFound,
    #[error("Store error: {0}")]
    Unknown(String),
}

impl StoreError {
    /// Map a backend error code onto the taxonomy.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "permission-denied" => Self::PermissionDenied,
            "unavailable" => Self::Unavailable,
            "not-found" => Self::NotFound,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Backend error code for this error.
    pub fn code(&self) -> &str {
        match self {
            Self::PermissionDenied => "permission-denied",
            Self::Unavailable => "unavailable",
            Self::NotFound => "not-found",
            Self::Unknown(code) => code,
        }
    }
}

/// A delivery on a live subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// Full current set of items in the owner scope, in arrival order
    Snapshot(Vec<WardrobeItem>),
    Error(StoreError),
}

/// Capability that stops delivery and releases a subscription.
pub struct Unsubscribe(Box<dyn FnOnce() + Send>);

impl Unsubscribe {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self(Box::new(release))
    }

    pub fn invoke(self) {
        (self.0)();
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Unsubscribe")
    }
}

/// Live view over one owner scope.
///
/// Dropping or cancelling the subscription releases it in the store and
/// discards any delivery that was already queued.
#[derive(Debug)]
pub struct Subscription {
    owner_id: String,
    events: mpsc::UnboundedReceiver<StoreEvent>,
    release: Option<Unsubscribe>,
}

impl Subscription {
    pub fn new(
        owner_id: impl Into<String>,
        events: mpsc::UnboundedReceiver<StoreEvent>,
        release: Unsubscribe,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            events,
            release: Some(release),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Next queued delivery without waiting.
    pub fn try_next(&mut self) -> Option<StoreEvent> {
        self.events.try_recv().ok()
    }

    /// Wait for the next delivery; `None` once the store side has closed.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        self.events.recv().await
    }

    /// Stop delivery. Synchronous from the caller's point of view.
    pub fn cancel(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        self.events.close();
        if let Some(release) = self.release.take() {
            release.invoke();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

/// Create/delete/subscribe against a remote document collection.
pub trait ItemStore: Send + Sync {
    /// Append one item with a store-assigned id and creation time.
    ///
    /// Callers validate label and image first.
    fn create(
        &self,
        owner_id: &str,
        label: &str,
        image: &EncodedImage,
    ) -> impl Future<Output = Result<ItemId, StoreError>> + Send;

    /// Remove an item. Deleting a missing id fails with [`StoreError::NotFound`].
    fn delete(&self, id: &ItemId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Open a live view over all items owned by `owner_id`.
    fn subscribe(&self, owner_id: &str) -> Subscription;
}
