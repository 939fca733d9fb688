//! Wardrobe item model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::media::EncodedImage;

/// Opaque item identifier assigned by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Generate a fresh, time-sortable identifier (UUID v7).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ItemId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("item id cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// A saved wardrobe item.
///
/// Items are immutable once written; the only mutation is deletion.
/// Serialized with the backing store's document field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardrobeItem {
    pub id: ItemId,
    /// Principal that created the item
    #[serde(rename = "userId")]
    pub owner_id: String,
    /// Non-empty, trimmed label
    pub label: String,
    #[serde(rename = "imageBase64")]
    pub image_data: EncodedImage,
    /// Creation time, used only for ordering
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl WardrobeItem {
    /// Build an item, trimming the label and rejecting an empty one.
    pub fn new(
        id: ItemId,
        owner_id: impl Into<String>,
        label: &str,
        image_data: EncodedImage,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::InvalidInput("item label cannot be empty".to_string()));
        }
        let owner_id = owner_id.into();
        if owner_id.trim().is_empty() {
            return Err(Error::InvalidInput("owner id cannot be empty".to_string()));
        }
        Ok(Self {
            id,
            owner_id,
            label: label.to_string(),
            image_data,
            created_at,
        })
    }
}
