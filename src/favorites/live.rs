use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_lock::Mutex as AsyncMutex;

use crate::favorites::cache::FavoritesCache;
use crate::favorites::error::{subscription_failed, FavoritesResult};
use crate::favorites::model::BasketScope;
use crate::favorites::store::{ChangeEvent, RemoteStore, Subscription};
use crate::util::observer::PartialObserver;

struct ActiveSubscription {
    scope: BasketScope,
    handle: Subscription,
}

/// Toggles the real-time subscription for the active scope.
///
/// Enabled only while the favorites surface is visible; the caller owns
/// that lifecycle tie. Incoming events merge into the cache for the
/// subscribed scope only and never touch pagination state. The
/// subscription slot lives behind an async mutex because it is held
/// across the subscribe await.
pub struct LiveUpdateController {
    store: Arc<dyn RemoteStore>,
    cache: Arc<StdMutex<FavoritesCache>>,
    active: AsyncMutex<Option<ActiveSubscription>>,
    epoch: Arc<AtomicU64>,
}

impl LiveUpdateController {
    pub fn new(store: Arc<dyn RemoteStore>, cache: Arc<StdMutex<FavoritesCache>>) -> Self {
        Self {
            store,
            cache,
            active: AsyncMutex::new(None),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribes to `scope`. Idempotent: enabling the already-subscribed
    /// scope is a no-op; a different scope replaces the subscription.
    pub async fn enable(&self, scope: BasketScope) -> FavoritesResult<()> {
        let mut active = self.active.lock().await;
        if let Some(current) = active.as_ref() {
            if current.scope == scope {
                return Ok(());
            }
        }

        // Retire the previous callback before its handle drops, so an
        // event already in flight cannot merge under the wrong scope.
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = active.take() {
            previous.handle.cancel();
        }

        let cache = Arc::clone(&self.cache);
        let epoch_guard = Arc::clone(&self.epoch);
        let subscribed_scope = scope.clone();
        let observer = PartialObserver::new()
            .with_next(move |event: &ChangeEvent| {
                if epoch_guard.load(Ordering::SeqCst) != epoch {
                    return;
                }
                if event.scope() != &subscribed_scope {
                    return;
                }
                cache.lock().unwrap().apply_change(event);
            })
            .with_error(|error: &dyn std::error::Error| {
                // Live merges stop until re-enabled; the pagination path
                // restores correctness on the next open.
                log::warn!("favorites live update stream error: {error}");
            });

        let handle = self
            .store
            .subscribe(&scope, observer)
            .await
            .map_err(|err| {
                subscription_failed(format!("failed to subscribe to favorites changes: {err}"))
            })?;
        *active = Some(ActiveSubscription { scope, handle });
        Ok(())
    }

    /// Tears the subscription down. Idempotent.
    pub async fn disable(&self) {
        let mut active = self.active.lock().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(subscription) = active.take() {
            subscription.handle.cancel();
        }
    }

    pub async fn is_enabled(&self) -> bool {
        self.active.lock().await.is_some()
    }

    pub async fn subscribed_scope(&self) -> Option<BasketScope> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|subscription| subscription.scope.clone())
    }
}
