use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use favorites_rs_core::{
    BasketScope, FavoriteAttributes, FavoriteDocument, FavoritesConfig, FavoritesProvider,
    InMemoryRemoteStore, ProductSnapshot, RemoteStore, ScopeLoadState, WriteOperation,
};

fn seed_favorites(store: &InMemoryRemoteStore, scope: &BasketScope, count: usize) {
    let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    for index in 0..count {
        store.add_favorite(
            scope,
            FavoriteDocument::new(
                format!("p{index:02}"),
                FavoriteAttributes::default(),
                base + chrono::Duration::seconds(index as i64),
            ),
        );
    }
}

fn provider_with(store: &InMemoryRemoteStore, config: FavoritesConfig) -> Arc<FavoritesProvider> {
    Arc::new(FavoritesProvider::new(
        Arc::new(store.clone()) as Arc<dyn RemoteStore>,
        config,
    ))
}

fn provider(store: &InMemoryRemoteStore) -> Arc<FavoritesProvider> {
    provider_with(store, FavoritesConfig::default())
}

#[tokio::test]
async fn forty_five_favorites_paginate_as_three_pages() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 45);
    let provider = provider(&store);

    let first = provider.load_next_page(20).await.unwrap();
    assert_eq!(first.entries.len(), 20);
    assert!(first.has_more);
    assert!(provider.has_more());

    let second = provider.load_next_page(20).await.unwrap();
    assert_eq!(second.entries.len(), 20);
    assert!(second.has_more);

    let third = provider.load_next_page(20).await.unwrap();
    assert_eq!(third.entries.len(), 5);
    assert!(!third.has_more);
    assert!(!provider.has_more());
    assert_eq!(provider.entries().len(), 45);
    assert_eq!(provider.load_state(), ScopeLoadState::LoadedExhausted);

    // Exhaustion is terminal: no further adapter traffic.
    let fourth = provider.load_next_page(20).await.unwrap();
    assert!(fourth.entries.is_empty());
    assert_eq!(store.fetch_page_calls(), 3);
}

#[tokio::test]
async fn pages_arrive_newest_first() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 3);
    let provider = provider(&store);

    provider.load_next_page(20).await.unwrap();
    let ids: Vec<String> = provider
        .entries()
        .into_iter()
        .map(|entry| entry.product_id)
        .collect();
    assert_eq!(ids, ["p02", "p01", "p00"]);
}

#[tokio::test]
async fn concurrent_loads_are_single_flight() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 20);
    store.set_fetch_delay(Some(Duration::from_millis(100)));
    let provider = provider(&store);

    let background = {
        let provider = Arc::clone(&provider);
        tokio::spawn(async move { provider.load_next_page(20).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(provider.is_loading_more());

    // Second call while the first is in flight: no-op, no second fetch.
    let blocked = provider.load_next_page(20).await.unwrap();
    assert!(blocked.entries.is_empty());
    assert_eq!(store.fetch_page_calls(), 1);

    let first = background.await.unwrap().unwrap();
    assert_eq!(first.entries.len(), 20);
    assert!(!provider.is_loading_more());
}

#[tokio::test]
async fn removing_a_favorite_twice_is_idempotent() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 3);
    let provider = provider(&store);
    provider.load_next_page(20).await.unwrap();

    provider.remove_from_favorites("p01").await.unwrap();
    provider.remove_from_favorites("p01").await.unwrap();

    assert_eq!(provider.entries().len(), 2);
    assert!(!store.contains_favorite(&BasketScope::Default, "p01"));
}

#[tokio::test]
async fn transfer_round_trip_preserves_attributes() {
    let store = InMemoryRemoteStore::new();
    store.add_favorite(
        &BasketScope::Default,
        FavoriteDocument::new(
            "p1",
            FavoriteAttributes {
                quantity: 3,
                selected_color: Some("teal".into()),
                selected_color_image: Some("https://img.example/p1-teal.jpg".into()),
            },
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        ),
    );
    let provider = provider(&store);
    provider.load_next_page(20).await.unwrap();

    let basket = provider.create_favorite_basket("Weekend").await.unwrap();
    provider
        .transfer_to_basket(&["p1".to_string()], Some(basket.id.as_str()))
        .await
        .unwrap();
    assert!(provider.entries().is_empty());
    assert!(store.contains_favorite(&basket.scope(), "p1"));

    provider.set_selected_basket(Some(basket.id.as_str())).await.unwrap();
    assert_eq!(provider.entries().len(), 1);

    provider
        .transfer_to_basket(&["p1".to_string()], None)
        .await
        .unwrap();
    provider.set_selected_basket(None).await.unwrap();

    let entries = provider.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].attributes.quantity, 3);
    assert_eq!(entries[0].attributes.selected_color.as_deref(), Some("teal"));
    assert!(store.contains_favorite(&BasketScope::Default, "p1"));
    assert!(!store.contains_favorite(&basket.scope(), "p1"));
}

#[tokio::test]
async fn switching_scopes_and_back_keeps_the_cache_warm() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 20);
    let provider = provider(&store);
    provider.load_next_page(20).await.unwrap();
    assert_eq!(provider.entries().len(), 20);

    let basket = provider.create_favorite_basket("Weekend").await.unwrap();
    provider.set_selected_basket(Some(basket.id.as_str())).await.unwrap();
    provider.set_selected_basket(None).await.unwrap();

    assert!(!provider.should_reload_favorites(&BasketScope::Default));
    assert_eq!(provider.entries().len(), 20);
    assert_eq!(store.fetch_page_calls(), 1);
}

#[tokio::test]
async fn stale_cache_asks_for_reload() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 5);
    let provider = provider_with(
        &store,
        FavoritesConfig::default().with_freshness(Duration::from_millis(30)),
    );
    provider.load_next_page(20).await.unwrap();
    assert!(!provider.should_reload_favorites(&BasketScope::Default));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(provider.should_reload_favorites(&BasketScope::Default));
}

#[tokio::test]
async fn deleting_the_selected_basket_falls_back_before_the_remote_confirms() {
    let store = InMemoryRemoteStore::new();
    let provider = provider(&store);
    let basket = provider.create_favorite_basket("Weekend").await.unwrap();
    provider.set_selected_basket(Some(basket.id.as_str())).await.unwrap();

    store.inject_write_failure();
    let err = provider.delete_favorite_basket(&basket.id).await.unwrap_err();
    assert_eq!(err.code_str(), "favorites/mutation-failed");

    // Fallback happened before the delete was issued, so the failed
    // remote call leaves the UI on a scope that still exists.
    assert_eq!(provider.selected_basket_id(), None);
    assert!(provider.baskets().is_empty());
}

#[tokio::test]
async fn live_removal_leaves_pagination_untouched() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 2);
    let provider = provider(&store);
    provider.load_next_page(20).await.unwrap();
    assert!(!provider.has_more());

    provider.enable_live_updates().await;
    store
        .write_batch(vec![WriteOperation::DeleteFavorite {
            scope: BasketScope::Default,
            product_id: "p00".into(),
        }])
        .await
        .unwrap();

    assert_eq!(provider.entries().len(), 1);
    assert!(!provider.has_more(), "live merges never touch exhaustion");
    assert!(!provider.is_loading_more());
    // And the cursor is equally untouched: an exhausted scope stays
    // exhausted, so no new fetch goes out.
    provider.load_next_page(20).await.unwrap();
    assert_eq!(store.fetch_page_calls(), 1);
}

#[tokio::test]
async fn live_additions_merge_into_the_active_scope_only() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 1);
    let provider = provider(&store);
    provider.load_next_page(20).await.unwrap();
    provider.enable_live_updates().await;

    // A favorite added from another screen lands in the active scope.
    store
        .write_batch(vec![WriteOperation::SetFavorite {
            scope: BasketScope::Default,
            doc: FavoriteDocument::new(
                "p99",
                FavoriteAttributes::default(),
                Utc.timestamp_opt(1_800_000_000, 0).unwrap(),
            ),
        }])
        .await
        .unwrap();
    let ids: Vec<String> = provider
        .entries()
        .into_iter()
        .map(|entry| entry.product_id)
        .collect();
    assert_eq!(ids, ["p99", "p00"]);

    // Writes against some other basket are not merged blindly.
    store
        .write_batch(vec![WriteOperation::SetFavorite {
            scope: BasketScope::Basket("elsewhere".into()),
            doc: FavoriteDocument::new(
                "p50",
                FavoriteAttributes::default(),
                Utc.timestamp_opt(1_800_000_001, 0).unwrap(),
            ),
        }])
        .await
        .unwrap();
    assert_eq!(provider.entries().len(), 2);

    provider.disable_live_updates().await;
    assert_eq!(store.listener_count(), 0);
}

#[tokio::test]
async fn watchdog_clears_loading_and_the_late_page_merges_silently() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 5);
    store.set_fetch_delay(Some(Duration::from_millis(200)));
    let provider = provider_with(
        &store,
        FavoritesConfig::default().with_load_timeout(Duration::from_millis(50)),
    );

    let err = provider.load_next_page(20).await.unwrap_err();
    assert_eq!(err.code_str(), "favorites/deadline-exceeded");
    assert!(!provider.is_loading_more(), "watchdog must clear the flag");
    assert!(provider.entries().is_empty());

    // The fetch was never cancelled; once it lands it merges quietly.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(provider.entries().len(), 5);
    assert!(!provider.has_more());
}

#[tokio::test]
async fn failed_page_fetch_surfaces_and_leaves_the_cache_unchanged() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 5);
    store.inject_fetch_failure();
    let provider = provider(&store);

    let err = provider.load_next_page(20).await.unwrap_err();
    assert_eq!(err.code_str(), "favorites/fetch-failed");
    assert!(provider.entries().is_empty());
    assert!(!provider.is_initial_load_complete());
    assert!(!provider.is_loading_more());

    // Manual retry succeeds.
    let page = provider.load_next_page(20).await.unwrap();
    assert_eq!(page.entries.len(), 5);
    assert!(provider.is_initial_load_complete());
}

#[tokio::test]
async fn failed_mutation_resynchronizes_via_reset_and_reload() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 5);
    let provider = provider(&store);
    provider.load_next_page(20).await.unwrap();

    store.inject_write_failure();
    let err = provider.remove_from_favorites("p02").await.unwrap_err();
    assert_eq!(err.code_str(), "favorites/mutation-failed");
    // Optimistic removal is visible until the resync.
    assert_eq!(provider.entries().len(), 4);

    provider.reset_pagination();
    assert!(provider.should_reload_favorites(&BasketScope::Default));
    let page = provider.load_next_page(20).await.unwrap();
    assert_eq!(page.entries.len(), 5, "resync restores the durable truth");
    assert_eq!(provider.entries().len(), 5);
}

#[tokio::test]
async fn join_fetch_hydrates_products_that_exist() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 2);
    store.add_product(ProductSnapshot {
        id: "p01".into(),
        name: "Walnut Bowl".into(),
        price: 24.5,
        currency: "EUR".into(),
        image_urls: vec!["https://img.example/bowl.jpg".into()],
        rating: Some(4.6),
    });
    let provider = provider(&store);

    provider.load_next_page(20).await.unwrap();
    let entries = provider.entries();
    let hydrated = entries.iter().find(|e| e.product_id == "p01").unwrap();
    let bare = entries.iter().find(|e| e.product_id == "p00").unwrap();
    assert_eq!(hydrated.product.as_ref().unwrap().name, "Walnut Bowl");
    assert!(bare.product.is_none());
}

#[tokio::test]
async fn reset_pagination_keeps_entries_visible_until_overwritten() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 5);
    let provider = provider(&store);
    provider.load_next_page(20).await.unwrap();
    assert!(!provider.has_more());

    provider.reset_pagination();
    assert!(provider.has_more(), "reset reopens the scope");
    assert_eq!(provider.entries().len(), 5, "entries survive the reset");

    // The next fetch starts from the beginning and overwrites in place.
    store.add_favorite(
        &BasketScope::Default,
        FavoriteDocument::new(
            "p10",
            FavoriteAttributes::default(),
            Utc.timestamp_opt(1_900_000_000, 0).unwrap(),
        ),
    );
    let page = provider.load_next_page(20).await.unwrap();
    assert_eq!(page.entries.len(), 6);
    assert_eq!(provider.entries().len(), 6);
}

#[tokio::test]
async fn dispose_tears_down_live_updates_and_state() {
    let store = InMemoryRemoteStore::new();
    seed_favorites(&store, &BasketScope::Default, 3);
    let provider = provider(&store);
    provider.load_next_page(20).await.unwrap();
    provider.enable_live_updates().await;
    assert_eq!(store.listener_count(), 1);

    provider.dispose().await;
    assert_eq!(store.listener_count(), 0);
    assert!(provider.entries().is_empty());
    let err = provider.load_next_page(20).await.unwrap_err();
    assert_eq!(err.code_str(), "favorites/disposed");
}
