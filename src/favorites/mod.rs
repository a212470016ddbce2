pub mod cache;
pub mod config;
pub mod error;
pub mod live;
pub mod model;
pub mod mutation;
pub mod pagination;
pub mod provider;
pub mod store;

pub use cache::{FavoritesCache, ScopeLoadState};
pub use config::FavoritesConfig;
pub use error::{FavoritesError, FavoritesErrorCode, FavoritesResult};
pub use live::LiveUpdateController;
pub use model::{
    BasketScope, FavoriteAttributes, FavoriteBasket, FavoriteDocument, FavoriteEntry, PageCursor,
    ProductSnapshot,
};
pub use mutation::MutationCoordinator;
pub use pagination::{BeginPage, PaginationState, PaginationTracker};
pub use provider::{FavoritesProvider, PageFetch};
pub use store::{
    ChangeEvent, InMemoryRemoteStore, RemoteStore, Subscription, WriteOperation,
};
