use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::favorites::error::{internal_error, invalid_argument, FavoritesResult};

/// Denormalized product data joined onto a favorite entry.
///
/// The snapshot is refreshed lazily after the entry appears in the cache;
/// the favorite record itself never owns product data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// Per-favorite metadata owned by the favorite record, independent of the
/// product snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FavoriteAttributes {
    pub quantity: u32,
    #[serde(default)]
    pub selected_color: Option<String>,
    #[serde(default)]
    pub selected_color_image: Option<String>,
}

impl Default for FavoriteAttributes {
    fn default() -> Self {
        Self {
            quantity: 1,
            selected_color: None,
            selected_color_image: None,
        }
    }
}

/// Wire representation of one favorite as the remote store reads and
/// writes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FavoriteDocument {
    pub product_id: String,
    #[serde(default)]
    pub attributes: FavoriteAttributes,
    pub added_at: DateTime<Utc>,
}

impl FavoriteDocument {
    pub fn new(
        product_id: impl Into<String>,
        attributes: FavoriteAttributes,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            attributes,
            added_at,
        }
    }

    /// Decodes a raw document value as produced by a store adapter.
    pub fn from_json(value: serde_json::Value) -> FavoritesResult<Self> {
        serde_json::from_value(value)
            .map_err(|err| invalid_argument(format!("malformed favorite document: {err}")))
    }

    pub fn to_json(&self) -> FavoritesResult<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|err| internal_error(format!("failed to encode favorite document: {err}")))
    }
}

/// One favorited product within a scope, as cached locally.
#[derive(Clone, Debug, PartialEq)]
pub struct FavoriteEntry {
    /// Unique within a scope.
    pub product_id: String,
    /// Absent until the join fetch completes.
    pub product: Option<ProductSnapshot>,
    pub attributes: FavoriteAttributes,
    /// Assigned at creation, never mutated.
    pub added_at: DateTime<Utc>,
}

impl FavoriteEntry {
    pub fn from_document(doc: FavoriteDocument) -> Self {
        Self {
            product_id: doc.product_id,
            product: None,
            attributes: doc.attributes,
            added_at: doc.added_at,
        }
    }

    pub fn to_document(&self) -> FavoriteDocument {
        FavoriteDocument {
            product_id: self.product_id.clone(),
            attributes: self.attributes.clone(),
            added_at: self.added_at,
        }
    }

    pub fn is_hydrated(&self) -> bool {
        self.product.is_some()
    }
}
