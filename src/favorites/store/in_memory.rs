use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;

use crate::favorites::error::{internal_error, subscription_failed, FavoritesError, FavoritesResult};
use crate::favorites::model::{
    BasketScope, FavoriteBasket, FavoriteDocument, PageCursor, ProductSnapshot,
};
use crate::util::observer::PartialObserver;

use super::{ChangeEvent, RemoteStore, Subscription, WriteOperation};

struct ListenerEntry {
    id: u64,
    scope: BasketScope,
    observer: PartialObserver<ChangeEvent>,
}

#[derive(Default)]
struct StoreState {
    favorites: BTreeMap<BasketScope, BTreeMap<String, FavoriteDocument>>,
    products: BTreeMap<String, ProductSnapshot>,
    baskets: BTreeMap<String, FavoriteBasket>,
    listeners: Vec<ListenerEntry>,
    next_listener_id: u64,
    fetch_page_calls: usize,
    write_batch_calls: usize,
    fail_next_fetch: bool,
    fail_next_write: bool,
    fail_next_subscribe: bool,
    fetch_delay: Option<Duration>,
}

/// Reference `RemoteStore` backed by in-process maps.
///
/// Serves the integration tests and doubles as the template for real
/// adapters: descending `(added_at, product_id)` page order, listener
/// registry notified on committed writes, and test affordances for
/// latency, call counting, and one-shot failure injection.
#[derive(Clone, Default)]
pub struct InMemoryRemoteStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, product: ProductSnapshot) {
        let mut state = self.state.lock().unwrap();
        state.products.insert(product.id.clone(), product);
    }

    /// Seeds a favorite without notifying listeners.
    pub fn add_favorite(&self, scope: &BasketScope, doc: FavoriteDocument) {
        let mut state = self.state.lock().unwrap();
        state
            .favorites
            .entry(scope.clone())
            .or_default()
            .insert(doc.product_id.clone(), doc);
    }

    pub fn add_basket(&self, basket: FavoriteBasket) {
        let mut state = self.state.lock().unwrap();
        state.baskets.insert(basket.id.clone(), basket);
    }

    pub fn favorites_in(&self, scope: &BasketScope) -> Vec<FavoriteDocument> {
        let state = self.state.lock().unwrap();
        state
            .favorites
            .get(scope)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn contains_favorite(&self, scope: &BasketScope, product_id: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .favorites
            .get(scope)
            .map(|docs| docs.contains_key(product_id))
            .unwrap_or(false)
    }

    pub fn fetch_page_calls(&self) -> usize {
        self.state.lock().unwrap().fetch_page_calls
    }

    pub fn write_batch_calls(&self) -> usize {
        self.state.lock().unwrap().write_batch_calls
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().unwrap().listeners.len()
    }

    /// The next `fetch_page` call fails once.
    pub fn inject_fetch_failure(&self) {
        self.state.lock().unwrap().fail_next_fetch = true;
    }

    /// The next `write_batch` call fails once, without applying anything.
    pub fn inject_write_failure(&self) {
        self.state.lock().unwrap().fail_next_write = true;
    }

    /// The next `subscribe` call fails once.
    pub fn inject_subscribe_failure(&self) {
        self.state.lock().unwrap().fail_next_subscribe = true;
    }

    /// Adds artificial latency to every subsequent `fetch_page` call.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        self.state.lock().unwrap().fetch_delay = delay;
    }

    /// Pushes a change event to matching listeners, bypassing the write
    /// path. Stands in for changes made elsewhere in the app.
    pub fn emit(&self, event: ChangeEvent) {
        let observers = self.observers_for(event.scope());
        for observer in observers {
            observer.emit(&event);
        }
    }

    /// Delivers a stream failure to every listener on `scope`.
    pub fn emit_error(&self, scope: &BasketScope, error: &FavoritesError) {
        let observers = self.observers_for(scope);
        for observer in observers {
            observer.emit_error(error);
        }
    }

    fn observers_for(&self, scope: &BasketScope) -> Vec<PartialObserver<ChangeEvent>> {
        let state = self.state.lock().unwrap();
        state
            .listeners
            .iter()
            .filter(|listener| &listener.scope == scope)
            .map(|listener| listener.observer.clone())
            .collect()
    }

    fn apply_writes(state: &mut StoreState, writes: Vec<WriteOperation>) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        for write in writes {
            match write {
                WriteOperation::SetFavorite { scope, doc } => {
                    let docs = state.favorites.entry(scope.clone()).or_default();
                    let replaced = docs.insert(doc.product_id.clone(), doc.clone()).is_some();
                    events.push(if replaced {
                        ChangeEvent::Modified { scope, doc }
                    } else {
                        ChangeEvent::Added { scope, doc }
                    });
                }
                WriteOperation::DeleteFavorite { scope, product_id } => {
                    let removed = state
                        .favorites
                        .get_mut(&scope)
                        .map(|docs| docs.remove(&product_id).is_some())
                        .unwrap_or(false);
                    if removed {
                        events.push(ChangeEvent::Removed { scope, product_id });
                    }
                }
                WriteOperation::SetBasket { basket } => {
                    state.baskets.insert(basket.id.clone(), basket);
                }
                WriteOperation::DeleteBasket { basket_id } => {
                    state.baskets.remove(&basket_id);
                    state.favorites.remove(&BasketScope::Basket(basket_id));
                }
            }
        }
        events
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn fetch_page(
        &self,
        scope: &BasketScope,
        cursor: Option<&PageCursor>,
        page_size: usize,
    ) -> FavoritesResult<Vec<FavoriteDocument>> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.fetch_page_calls += 1;
            if state.fail_next_fetch {
                state.fail_next_fetch = false;
                return Err(internal_error("injected fetch failure"));
            }
            state.fetch_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        let mut docs: Vec<FavoriteDocument> = state
            .favorites
            .get(scope)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();

        docs.sort_by(|left, right| {
            (right.added_at, right.product_id.as_str())
                .cmp(&(left.added_at, left.product_id.as_str()))
        });

        if let Some(cursor) = cursor {
            docs.retain(|doc| cursor.precedes(doc));
        }
        docs.truncate(page_size);
        Ok(docs)
    }

    async fn fetch_product(&self, product_id: &str) -> FavoritesResult<Option<ProductSnapshot>> {
        let state = self.state.lock().unwrap();
        Ok(state.products.get(product_id).cloned())
    }

    async fn fetch_baskets(&self) -> FavoritesResult<Vec<FavoriteBasket>> {
        let state = self.state.lock().unwrap();
        let mut baskets: Vec<FavoriteBasket> = state.baskets.values().cloned().collect();
        baskets.sort_by(|left, right| {
            (left.created_at, left.id.as_str()).cmp(&(right.created_at, right.id.as_str()))
        });
        Ok(baskets)
    }

    async fn subscribe(
        &self,
        scope: &BasketScope,
        observer: PartialObserver<ChangeEvent>,
    ) -> FavoritesResult<Subscription> {
        let id = {
            let mut state = self.state.lock().unwrap();
            if state.fail_next_subscribe {
                state.fail_next_subscribe = false;
                return Err(subscription_failed("injected subscription failure"));
            }
            let id = state.next_listener_id;
            state.next_listener_id += 1;
            state.listeners.push(ListenerEntry {
                id,
                scope: scope.clone(),
                observer,
            });
            id
        };

        let weak: Weak<Mutex<StoreState>> = Arc::downgrade(&self.state);
        Ok(Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state
                    .lock()
                    .unwrap()
                    .listeners
                    .retain(|listener| listener.id != id);
            }
        }))
    }

    async fn write_batch(&self, writes: Vec<WriteOperation>) -> FavoritesResult<()> {
        let events = {
            let mut state = self.state.lock().unwrap();
            state.write_batch_calls += 1;
            if state.fail_next_write {
                state.fail_next_write = false;
                return Err(internal_error("injected write failure"));
            }
            Self::apply_writes(&mut state, writes)
        };

        // Dispatch outside the lock; observers re-enter other locks.
        for event in events {
            let observers = self.observers_for(event.scope());
            for observer in observers {
                observer.emit(&event);
            }
        }
        Ok(())
    }
}
