//! Client-side favorites cache and synchronization core for a
//! marketplace storefront.
//!
//! The crate reconciles basket-scoped collections, cursor-based
//! pagination, optimistic mutations with rollback-by-resync, toggled
//! real-time subscriptions, and a bounded loading-timeout guard. The
//! document database backing it all is an external collaborator injected
//! through the [`favorites::RemoteStore`] trait; the cache is a
//! best-effort projection and never the source of truth.

pub mod favorites;
pub mod util;

pub use favorites::{
    BasketScope, ChangeEvent, FavoriteAttributes, FavoriteBasket, FavoriteDocument, FavoriteEntry,
    FavoritesConfig, FavoritesError, FavoritesErrorCode, FavoritesProvider, FavoritesResult,
    InMemoryRemoteStore, PageCursor, PageFetch, ProductSnapshot, RemoteStore, ScopeLoadState,
    Subscription, WriteOperation,
};
