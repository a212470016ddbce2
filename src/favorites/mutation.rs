use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;

use crate::favorites::cache::FavoritesCache;
use crate::favorites::error::{invalid_argument, mutation_failed, FavoritesResult};
use crate::favorites::model::ids::next_basket_id;
use crate::favorites::model::{BasketScope, FavoriteBasket};
use crate::favorites::pagination::PaginationTracker;
use crate::favorites::store::{RemoteStore, WriteOperation};

/// Executes membership mutations with optimistic local updates and
/// background persistence.
///
/// Failure policy is resync-over-rollback: a failed write reports
/// `favorites/mutation-failed` and the caller re-fetches the scope
/// instead of re-inserting possibly stale attribute data. Every
/// membership change invalidates the affected scopes' exhaustion state,
/// since the total count may have moved.
pub struct MutationCoordinator {
    store: Arc<dyn RemoteStore>,
    cache: Arc<StdMutex<FavoritesCache>>,
    pagination: Arc<StdMutex<PaginationTracker>>,
}

impl MutationCoordinator {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        cache: Arc<StdMutex<FavoritesCache>>,
        pagination: Arc<StdMutex<PaginationTracker>>,
    ) -> Self {
        Self {
            store,
            cache,
            pagination,
        }
    }

    /// Removes favorites from `scope`. The cache drops the entries before
    /// the network round-trip; removing an id that is already gone is a
    /// harmless no-op.
    pub async fn remove_multiple(
        &self,
        scope: &BasketScope,
        product_ids: &[String],
    ) -> FavoritesResult<()> {
        if product_ids.is_empty() {
            return Ok(());
        }

        {
            let mut cache = self.cache.lock().unwrap();
            cache.remove_ids(scope, product_ids);
            self.pagination.lock().unwrap().invalidate(scope);
        }

        let writes = product_ids
            .iter()
            .map(|product_id| WriteOperation::DeleteFavorite {
                scope: scope.clone(),
                product_id: product_id.clone(),
            })
            .collect();

        self.store.write_batch(writes).await.map_err(|err| {
            log::warn!("favorites removal failed to persist: {err}");
            mutation_failed(format!("failed to persist favorite removal: {err}"))
        })
    }

    /// Moves favorites between scopes as one atomic batch. On failure the
    /// caller resynchronizes both scopes; there is no partial rollback.
    pub async fn transfer(
        &self,
        source: &BasketScope,
        product_ids: &[String],
        target: &BasketScope,
    ) -> FavoritesResult<()> {
        if source == target || product_ids.is_empty() {
            return Ok(());
        }

        let moved = {
            let mut cache = self.cache.lock().unwrap();
            let moved = cache.move_entries(source, target, product_ids);
            let mut pagination = self.pagination.lock().unwrap();
            pagination.invalidate(source);
            pagination.invalidate(target);
            moved
        };
        if moved.is_empty() {
            return Ok(());
        }

        let mut writes = Vec::with_capacity(moved.len() * 2);
        for entry in &moved {
            writes.push(WriteOperation::DeleteFavorite {
                scope: source.clone(),
                product_id: entry.product_id.clone(),
            });
            writes.push(WriteOperation::SetFavorite {
                scope: target.clone(),
                doc: entry.to_document(),
            });
        }

        self.store.write_batch(writes).await.map_err(|err| {
            log::warn!("favorites transfer failed to persist: {err}");
            mutation_failed(format!("failed to persist favorites transfer: {err}"))
        })
    }

    /// Creates a named basket. Not optimistic: the basket only exists for
    /// callers once the write confirms.
    pub async fn create_basket(&self, name: &str) -> FavoritesResult<FavoriteBasket> {
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid_argument("basket name must not be blank"));
        }

        let now = Utc::now();
        let basket = FavoriteBasket::new(
            next_basket_id(now.timestamp_millis().max(0) as u64),
            name,
            now,
        );
        self.store
            .write_batch(vec![WriteOperation::SetBasket {
                basket: basket.clone(),
            }])
            .await
            .map_err(|err| {
                log::warn!("basket creation failed to persist: {err}");
                mutation_failed(format!("failed to create basket: {err}"))
            })?;
        Ok(basket)
    }

    /// Deletes a basket and its collection. The provider performs scope
    /// fallback before calling this; here the cached projection and
    /// pagination state go away optimistically.
    pub async fn delete_basket(&self, basket_id: &str) -> FavoritesResult<()> {
        let scope = BasketScope::Basket(basket_id.to_string());
        {
            let mut cache = self.cache.lock().unwrap();
            cache.drop_scope(&scope);
            self.pagination.lock().unwrap().remove_scope(&scope);
        }

        self.store
            .write_batch(vec![WriteOperation::DeleteBasket {
                basket_id: basket_id.to_string(),
            }])
            .await
            .map_err(|err| {
                log::warn!("basket deletion failed to persist: {err}");
                mutation_failed(format!("failed to delete basket: {err}"))
            })
    }
}
