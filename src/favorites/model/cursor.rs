use chrono::{DateTime, Utc};

use super::entry::FavoriteDocument;

/// Opaque pagination position: the sort key of the last fetched document.
///
/// UI code only carries this around; adapters use the fields to resume a
/// query ordered by `added_at` descending with `product_id` as tiebreaker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageCursor {
    pub added_at: DateTime<Utc>,
    pub product_id: String,
}

impl PageCursor {
    pub fn from_document(doc: &FavoriteDocument) -> Self {
        Self {
            added_at: doc.added_at,
            product_id: doc.product_id.clone(),
        }
    }

    /// True when `doc` sorts strictly after this cursor in the descending
    /// page order.
    pub fn precedes(&self, doc: &FavoriteDocument) -> bool {
        (doc.added_at, doc.product_id.as_str()) < (self.added_at, self.product_id.as_str())
    }
}
