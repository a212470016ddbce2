use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use crate::favorites::cache::{FavoritesCache, ScopeLoadState};
use crate::favorites::config::FavoritesConfig;
use crate::favorites::error::{
    deadline_exceeded, disposed, fetch_failed, internal_error, invalid_argument, not_found,
    FavoritesResult,
};
use crate::favorites::live::LiveUpdateController;
use crate::favorites::model::{
    BasketScope, FavoriteBasket, FavoriteEntry, PageCursor,
};
use crate::favorites::mutation::MutationCoordinator;
use crate::favorites::pagination::{BeginPage, PaginationTracker};
use crate::favorites::store::RemoteStore;

/// Result of one `load_next_page` call: the entries that landed in the
/// cache for this page (empty when the call no-ops) and whether more
/// pages remain.
#[derive(Clone, Debug)]
pub struct PageFetch {
    pub entries: Vec<FavoriteEntry>,
    pub has_more: bool,
}

/// The contract consumed by every favorites UI surface.
///
/// An explicit context object: construct once at app start, pass by
/// reference, tear down with [`dispose`](FavoritesProvider::dispose).
/// All failures come back as `FavoritesResult` values; nothing here is
/// fatal, everything degrades to stale-or-empty state with manual retry.
pub struct FavoritesProvider {
    store: Arc<dyn RemoteStore>,
    config: FavoritesConfig,
    cache: Arc<StdMutex<FavoritesCache>>,
    pagination: Arc<StdMutex<PaginationTracker>>,
    selected: StdMutex<BasketScope>,
    baskets: StdMutex<Vec<FavoriteBasket>>,
    mutations: MutationCoordinator,
    live: LiveUpdateController,
    disposed: AtomicBool,
}

impl FavoritesProvider {
    pub fn new(store: Arc<dyn RemoteStore>, config: FavoritesConfig) -> Self {
        let cache = Arc::new(StdMutex::new(FavoritesCache::new()));
        let pagination = Arc::new(StdMutex::new(PaginationTracker::new()));
        let mutations = MutationCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            Arc::clone(&pagination),
        );
        let live = LiveUpdateController::new(Arc::clone(&store), Arc::clone(&cache));
        Self {
            store,
            config,
            cache,
            pagination,
            selected: StdMutex::new(BasketScope::Default),
            baskets: StdMutex::new(Vec::new()),
            mutations,
            live,
            disposed: AtomicBool::new(false),
        }
    }

    // ---- read surface -----------------------------------------------

    pub fn selected_scope(&self) -> BasketScope {
        self.selected.lock().unwrap().clone()
    }

    pub fn selected_basket_id(&self) -> Option<String> {
        self.selected_scope().id().map(str::to_string)
    }

    pub fn entries(&self) -> Vec<FavoriteEntry> {
        let scope = self.selected_scope();
        self.cache.lock().unwrap().entries(&scope)
    }

    pub fn has_more(&self) -> bool {
        let scope = self.selected_scope();
        self.pagination.lock().unwrap().has_more(&scope)
    }

    pub fn is_loading_more(&self) -> bool {
        let scope = self.selected_scope();
        self.pagination.lock().unwrap().is_loading_more(&scope)
    }

    pub fn is_initial_load_complete(&self) -> bool {
        let scope = self.selected_scope();
        self.cache.lock().unwrap().is_initial_load_complete(&scope)
    }

    pub fn load_state(&self) -> ScopeLoadState {
        let scope = self.selected_scope();
        self.cache.lock().unwrap().load_state(&scope)
    }

    pub fn baskets(&self) -> Vec<FavoriteBasket> {
        self.baskets.lock().unwrap().clone()
    }

    pub fn should_reload_favorites(&self, scope: &BasketScope) -> bool {
        self.cache
            .lock()
            .unwrap()
            .should_reload(scope, self.config.freshness, Instant::now())
    }

    // ---- pagination -------------------------------------------------

    /// Fetches the next page for the selected scope.
    ///
    /// No-ops (returning an empty `PageFetch`) when a fetch for the scope
    /// is already in flight or the scope is exhausted. The wait is bounded
    /// by the configured watchdog timeout: on expiry the loading flag is
    /// force-cleared and `favorites/deadline-exceeded` returned while the
    /// fetch itself runs on and merges into the cache silently.
    pub async fn load_next_page(&self, page_size: usize) -> FavoritesResult<PageFetch> {
        self.ensure_active()?;
        if page_size == 0 {
            return Err(invalid_argument("page_size must be at least 1"));
        }

        let scope = self.selected_scope();
        let (generation, cursor) = {
            let mut pagination = self.pagination.lock().unwrap();
            match pagination.begin(&scope) {
                BeginPage::Started(generation) => (generation, pagination.cursor(&scope)),
                BeginPage::AlreadyLoading | BeginPage::Exhausted => {
                    return Ok(PageFetch {
                        entries: Vec::new(),
                        has_more: pagination.has_more(&scope),
                    });
                }
            }
        };
        self.cache.lock().unwrap().set_loading(&scope);

        let task = tokio::spawn(fetch_and_merge(
            Arc::clone(&self.store),
            Arc::clone(&self.cache),
            Arc::clone(&self.pagination),
            scope.clone(),
            cursor,
            page_size,
            generation,
        ));

        match tokio::time::timeout(self.config.load_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                self.pagination.lock().unwrap().force_clear_loading(&scope);
                self.cache.lock().unwrap().load_failed(&scope);
                Err(internal_error(format!("page fetch task failed: {join_error}")))
            }
            Err(_elapsed) => {
                // UX safety net, not a cancellation: the task keeps the
                // fetch alive and merges whenever it lands.
                self.pagination.lock().unwrap().force_clear_loading(&scope);
                Err(deadline_exceeded(
                    "favorites page fetch timed out; any late result merges in the background",
                ))
            }
        }
    }

    /// Clears cursor and exhaustion for the selected scope after a
    /// structural change. Cached entries stay visible until the next
    /// fetch overwrites them.
    pub fn reset_pagination(&self) {
        let scope = self.selected_scope();
        self.pagination.lock().unwrap().reset(&scope);
        self.cache.lock().unwrap().mark_stale(&scope);
    }

    // ---- scope selection --------------------------------------------

    /// Selects a basket (`Some(id)`) or the default collection (`None`).
    /// Other scopes' cached pages are preserved. Re-subscribes live
    /// updates when they are enabled.
    pub async fn set_selected_basket(&self, basket_id: Option<&str>) -> FavoritesResult<()> {
        self.ensure_active()?;
        let scope = match basket_id {
            None => BasketScope::Default,
            Some(id) => {
                let known = self.baskets.lock().unwrap().iter().any(|b| b.id == id);
                if !known {
                    return Err(not_found(format!("unknown favorite basket {id}")));
                }
                BasketScope::Basket(id.to_string())
            }
        };

        *self.selected.lock().unwrap() = scope.clone();
        self.resubscribe_if_live(scope).await;
        Ok(())
    }

    // ---- mutations --------------------------------------------------

    pub async fn remove_from_favorites(&self, product_id: &str) -> FavoritesResult<()> {
        self.remove_multiple_from_favorites(&[product_id.to_string()])
            .await
    }

    pub async fn remove_multiple_from_favorites(
        &self,
        product_ids: &[String],
    ) -> FavoritesResult<()> {
        self.ensure_active()?;
        let scope = self.selected_scope();
        self.mutations.remove_multiple(&scope, product_ids).await
    }

    /// Moves favorites from the selected scope into `target_basket_id`
    /// (`None` targets the default collection).
    pub async fn transfer_to_basket(
        &self,
        product_ids: &[String],
        target_basket_id: Option<&str>,
    ) -> FavoritesResult<()> {
        self.ensure_active()?;
        if let Some(id) = target_basket_id {
            let known = self.baskets.lock().unwrap().iter().any(|b| b.id == id);
            if !known {
                return Err(not_found(format!("unknown favorite basket {id}")));
            }
        }
        let source = self.selected_scope();
        let target = BasketScope::from_id(target_basket_id);
        self.mutations.transfer(&source, product_ids, &target).await
    }

    pub async fn create_favorite_basket(&self, name: &str) -> FavoritesResult<FavoriteBasket> {
        self.ensure_active()?;
        let basket = self.mutations.create_basket(name).await?;
        self.baskets.lock().unwrap().push(basket.clone());
        Ok(basket)
    }

    /// Deletes a basket. When it is the selected one, selection falls
    /// back to the default scope before the remote delete is issued, so
    /// the UI never references a scope that no longer exists.
    pub async fn delete_favorite_basket(&self, basket_id: &str) -> FavoritesResult<()> {
        self.ensure_active()?;

        let fell_back = {
            let mut selected = self.selected.lock().unwrap();
            if selected.id() == Some(basket_id) {
                *selected = BasketScope::Default;
                true
            } else {
                false
            }
        };
        if fell_back {
            self.resubscribe_if_live(BasketScope::Default).await;
        }
        self.baskets.lock().unwrap().retain(|b| b.id != basket_id);

        self.mutations.delete_basket(basket_id).await
    }

    /// Reads the user's basket collection through the adapter and
    /// replaces the local list.
    pub async fn refresh_baskets(&self) -> FavoritesResult<Vec<FavoriteBasket>> {
        self.ensure_active()?;
        let baskets = self
            .store
            .fetch_baskets()
            .await
            .map_err(|err| fetch_failed(format!("failed to load favorite baskets: {err}")))?;
        *self.baskets.lock().unwrap() = baskets.clone();
        Ok(baskets)
    }

    // ---- live updates -----------------------------------------------

    /// Starts live updates for the selected scope. Bound by the caller to
    /// surface visibility. Failures are logged, never user-facing: live
    /// freshness is best-effort and pagination restores correctness.
    pub async fn enable_live_updates(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        let scope = self.selected_scope();
        if let Err(err) = self.live.enable(scope).await {
            log::warn!("favorites live updates unavailable: {err}");
        }
    }

    pub async fn disable_live_updates(&self) {
        self.live.disable().await;
    }

    // ---- lifecycle --------------------------------------------------

    /// Tears down the subscription and drops all cached state. Mutating
    /// calls afterwards return `favorites/disposed`.
    pub async fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.live.disable().await;
        self.cache.lock().unwrap().clear();
        self.pagination.lock().unwrap().clear();
        self.baskets.lock().unwrap().clear();
        *self.selected.lock().unwrap() = BasketScope::Default;
    }

    fn ensure_active(&self) -> FavoritesResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(disposed());
        }
        Ok(())
    }

    async fn resubscribe_if_live(&self, scope: BasketScope) {
        if self.live.is_enabled().await {
            if let Err(err) = self.live.enable(scope).await {
                log::warn!("favorites live updates lost on scope switch: {err}");
            }
        }
    }
}

/// Runs one page fetch to completion: adapter read, denormalizing join,
/// cache merge, pagination bookkeeping. Spawned so the provider can stop
/// waiting without cancelling the work.
async fn fetch_and_merge(
    store: Arc<dyn RemoteStore>,
    cache: Arc<StdMutex<FavoritesCache>>,
    pagination: Arc<StdMutex<PaginationTracker>>,
    scope: BasketScope,
    cursor: Option<PageCursor>,
    page_size: usize,
    generation: u64,
) -> FavoritesResult<PageFetch> {
    let from_start = cursor.is_none();
    let docs = match store.fetch_page(&scope, cursor.as_ref(), page_size).await {
        Ok(docs) => docs,
        Err(err) => {
            pagination.lock().unwrap().fail(&scope, generation);
            cache.lock().unwrap().load_failed(&scope);
            return Err(fetch_failed(format!("favorites page fetch failed: {err}")));
        }
    };

    let fetched = docs.len();
    let next_cursor = docs.last().map(PageCursor::from_document);
    let mut entries: Vec<FavoriteEntry> =
        docs.into_iter().map(FavoriteEntry::from_document).collect();

    // Denormalizing join: a failed or missing product read degrades to an
    // unhydrated entry, it does not fail the page.
    for entry in &mut entries {
        match store.fetch_product(&entry.product_id).await {
            Ok(Some(product)) => entry.product = Some(product),
            Ok(None) => {
                log::debug!("product {} missing during favorites join", entry.product_id);
            }
            Err(err) => {
                log::warn!("favorites join fetch failed for {}: {err}", entry.product_id);
            }
        }
    }

    let has_more = fetched >= page_size;
    let merged = {
        let mut cache = cache.lock().unwrap();
        if from_start {
            cache.replace_page(&scope, entries, has_more, Instant::now())
        } else {
            cache.append_page(&scope, entries, has_more, Instant::now())
        }
    };
    pagination
        .lock()
        .unwrap()
        .complete(&scope, generation, next_cursor, fetched, page_size);

    Ok(PageFetch {
        entries: merged,
        has_more,
    })
}
