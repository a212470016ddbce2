use async_trait::async_trait;

use crate::favorites::error::FavoritesResult;
use crate::favorites::model::{
    BasketScope, FavoriteBasket, FavoriteDocument, PageCursor, ProductSnapshot,
};
use crate::util::observer::{PartialObserver, Unsubscribe};

pub mod in_memory;

/// One entry in a batched write. Batches commit atomically on the remote
/// side or not at all.
#[derive(Clone, Debug)]
pub enum WriteOperation {
    SetFavorite {
        scope: BasketScope,
        doc: FavoriteDocument,
    },
    DeleteFavorite {
        scope: BasketScope,
        product_id: String,
    },
    SetBasket {
        basket: FavoriteBasket,
    },
    /// Also clears the basket's favorites collection.
    DeleteBasket {
        basket_id: String,
    },
}

/// Push-based change notification for a single favorite within a scope.
#[derive(Clone, Debug)]
pub enum ChangeEvent {
    Added {
        scope: BasketScope,
        doc: FavoriteDocument,
    },
    Modified {
        scope: BasketScope,
        doc: FavoriteDocument,
    },
    Removed {
        scope: BasketScope,
        product_id: String,
    },
}

impl ChangeEvent {
    pub fn scope(&self) -> &BasketScope {
        match self {
            ChangeEvent::Added { scope, .. }
            | ChangeEvent::Modified { scope, .. }
            | ChangeEvent::Removed { scope, .. } => scope,
        }
    }

    pub fn product_id(&self) -> &str {
        match self {
            ChangeEvent::Added { doc, .. } | ChangeEvent::Modified { doc, .. } => &doc.product_id,
            ChangeEvent::Removed { product_id, .. } => product_id,
        }
    }
}

/// Handle for an established real-time subscription. Cancelling (or
/// dropping) tears the listener down; both are idempotent.
pub struct Subscription {
    cancel: Option<Unsubscribe>,
}

impl Subscription {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Narrow seam to the document database that owns the durable favorites
/// state. The cache layer is a best-effort projection over this store and
/// never the source of truth.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Fetches at most `page_size` favorites after `cursor` for `scope`,
    /// ordered by `added_at` descending.
    async fn fetch_page(
        &self,
        scope: &BasketScope,
        cursor: Option<&PageCursor>,
        page_size: usize,
    ) -> FavoritesResult<Vec<FavoriteDocument>>;

    /// Point read of a product document for the denormalizing join.
    async fn fetch_product(&self, product_id: &str) -> FavoritesResult<Option<ProductSnapshot>>;

    /// Reads the user's basket collection.
    async fn fetch_baskets(&self) -> FavoritesResult<Vec<FavoriteBasket>>;

    /// Establishes a real-time subscription to `scope`'s collection.
    async fn subscribe(
        &self,
        scope: &BasketScope,
        observer: PartialObserver<ChangeEvent>,
    ) -> FavoritesResult<Subscription>;

    /// Commits the batch atomically.
    async fn write_batch(&self, writes: Vec<WriteOperation>) -> FavoritesResult<()>;
}

pub use in_memory::InMemoryRemoteStore;
