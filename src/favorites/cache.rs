use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::favorites::model::{BasketScope, FavoriteEntry, ProductSnapshot};
use crate::favorites::store::ChangeEvent;

/// Load progression for one scope. `Loaded` and `LoadedExhausted` differ
/// only in whether more pages remain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeLoadState {
    Uninitialized,
    Loading,
    Loaded,
    LoadedExhausted,
}

#[derive(Debug)]
struct ScopeEntries {
    entries: Vec<FavoriteEntry>,
    loaded_at: Option<Instant>,
    state: ScopeLoadState,
    stale: bool,
}

impl ScopeEntries {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            loaded_at: None,
            state: ScopeLoadState::Uninitialized,
            stale: false,
        }
    }
}

/// In-memory projection of the per-scope favorites lists.
///
/// Keyed by scope so switching the selected basket never discards another
/// scope's pages. Purely synchronous; callers hold the lock. The remote
/// store owns the durable truth and this projection is invalidatable at
/// any time.
#[derive(Debug, Default)]
pub struct FavoritesCache {
    scopes: BTreeMap<BasketScope, ScopeEntries>,
    last_loaded_scope: Option<BasketScope>,
}

impl FavoritesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self, scope: &BasketScope) -> Vec<FavoriteEntry> {
        self.scopes
            .get(scope)
            .map(|scoped| scoped.entries.clone())
            .unwrap_or_default()
    }

    pub fn len(&self, scope: &BasketScope) -> usize {
        self.scopes
            .get(scope)
            .map(|scoped| scoped.entries.len())
            .unwrap_or(0)
    }

    pub fn load_state(&self, scope: &BasketScope) -> ScopeLoadState {
        self.scopes
            .get(scope)
            .map(|scoped| scoped.state)
            .unwrap_or(ScopeLoadState::Uninitialized)
    }

    pub fn is_initial_load_complete(&self, scope: &BasketScope) -> bool {
        matches!(
            self.load_state(scope),
            ScopeLoadState::Loaded | ScopeLoadState::LoadedExhausted
        )
    }

    /// The single decision point that prevents redundant refetches when a
    /// UI surface re-mounts with unchanged data.
    pub fn should_reload(&self, scope: &BasketScope, freshness: Duration, now: Instant) -> bool {
        if self.last_loaded_scope.as_ref() != Some(scope) {
            return true;
        }
        let Some(scoped) = self.scopes.get(scope) else {
            return true;
        };
        if scoped.stale {
            return true;
        }
        match scoped.loaded_at {
            Some(loaded_at) => now.saturating_duration_since(loaded_at) > freshness,
            None => true,
        }
    }

    pub fn set_loading(&mut self, scope: &BasketScope) {
        let scoped = self.scoped_mut(scope);
        scoped.state = ScopeLoadState::Loading;
    }

    /// Records a failed fetch. A scope that never loaded returns to
    /// `Uninitialized`; one with data keeps presenting it.
    pub fn load_failed(&mut self, scope: &BasketScope) {
        let scoped = self.scoped_mut(scope);
        scoped.state = match scoped.loaded_at {
            Some(_) => ScopeLoadState::Loaded,
            None => ScopeLoadState::Uninitialized,
        };
    }

    /// Installs a page fetched from the start of the scope, overwriting
    /// whatever was cached. Previous entries stay visible until this call.
    pub fn replace_page(
        &mut self,
        scope: &BasketScope,
        entries: Vec<FavoriteEntry>,
        has_more: bool,
        now: Instant,
    ) -> Vec<FavoriteEntry> {
        let scoped = self.scoped_mut(scope);
        scoped.entries = entries;
        Self::finish_load(scoped, has_more, now);
        self.last_loaded_scope = Some(scope.clone());
        self.entries(scope)
    }

    /// Appends a cursor continuation, skipping ids already present (a live
    /// update may have inserted them first). Returns the entries actually
    /// appended.
    pub fn append_page(
        &mut self,
        scope: &BasketScope,
        entries: Vec<FavoriteEntry>,
        has_more: bool,
        now: Instant,
    ) -> Vec<FavoriteEntry> {
        let scoped = self.scoped_mut(scope);
        let mut appended = Vec::new();
        for entry in entries {
            let exists = scoped
                .entries
                .iter()
                .any(|cached| cached.product_id == entry.product_id);
            if !exists {
                scoped.entries.push(entry.clone());
                appended.push(entry);
            }
        }
        Self::finish_load(scoped, has_more, now);
        self.last_loaded_scope = Some(scope.clone());
        appended
    }

    fn finish_load(scoped: &mut ScopeEntries, has_more: bool, now: Instant) {
        scoped.loaded_at = Some(now);
        scoped.stale = false;
        scoped.state = if has_more {
            ScopeLoadState::Loaded
        } else {
            ScopeLoadState::LoadedExhausted
        };
    }

    /// Merges a join-fetched product snapshot by id. Never reorders the
    /// list or disturbs entries still awaiting their own join.
    pub fn merge_product(
        &mut self,
        scope: &BasketScope,
        product_id: &str,
        product: ProductSnapshot,
    ) -> bool {
        let Some(scoped) = self.scopes.get_mut(scope) else {
            return false;
        };
        match scoped
            .entries
            .iter_mut()
            .find(|entry| entry.product_id == product_id)
        {
            Some(entry) => {
                entry.product = Some(product);
                true
            }
            None => false,
        }
    }

    /// Merges one live-update event. Pagination state is none of this
    /// method's business.
    pub fn apply_change(&mut self, event: &ChangeEvent) {
        match event {
            ChangeEvent::Added { scope, doc } => {
                let scoped = self.scoped_mut(scope);
                let exists = scoped
                    .entries
                    .iter()
                    .any(|entry| entry.product_id == doc.product_id);
                if exists {
                    return;
                }
                let entry = FavoriteEntry::from_document(doc.clone());
                let position = scoped
                    .entries
                    .iter()
                    .position(|cached| {
                        (cached.added_at, cached.product_id.as_str())
                            < (entry.added_at, entry.product_id.as_str())
                    })
                    .unwrap_or(scoped.entries.len());
                scoped.entries.insert(position, entry);
            }
            ChangeEvent::Modified { scope, doc } => {
                if let Some(scoped) = self.scopes.get_mut(scope) {
                    if let Some(entry) = scoped
                        .entries
                        .iter_mut()
                        .find(|entry| entry.product_id == doc.product_id)
                    {
                        // added_at is immutable; the cached product
                        // snapshot survives an attribute change.
                        entry.attributes = doc.attributes.clone();
                    }
                }
            }
            ChangeEvent::Removed { scope, product_id } => {
                if let Some(scoped) = self.scopes.get_mut(scope) {
                    scoped.entries.retain(|entry| &entry.product_id != product_id);
                }
            }
        }
    }

    /// Optimistically removes entries by id. Absent ids are skipped.
    pub fn remove_ids(&mut self, scope: &BasketScope, ids: &[String]) -> usize {
        let Some(scoped) = self.scopes.get_mut(scope) else {
            return 0;
        };
        let before = scoped.entries.len();
        scoped
            .entries
            .retain(|entry| !ids.contains(&entry.product_id));
        before - scoped.entries.len()
    }

    /// Optimistically moves entries between scopes, attributes intact.
    /// The target becomes stale so the next visibility check refetches it.
    pub fn move_entries(
        &mut self,
        source: &BasketScope,
        target: &BasketScope,
        ids: &[String],
    ) -> Vec<FavoriteEntry> {
        let moved: Vec<FavoriteEntry> = {
            let Some(scoped) = self.scopes.get_mut(source) else {
                return Vec::new();
            };
            let (moved, kept): (Vec<_>, Vec<_>) = scoped
                .entries
                .drain(..)
                .partition(|entry| ids.contains(&entry.product_id));
            scoped.entries = kept;
            moved
        };

        let target_scoped = self.scoped_mut(target);
        for entry in &moved {
            let exists = target_scoped
                .entries
                .iter()
                .any(|cached| cached.product_id == entry.product_id);
            if exists {
                continue;
            }
            let position = target_scoped
                .entries
                .iter()
                .position(|cached| {
                    (cached.added_at, cached.product_id.as_str())
                        < (entry.added_at, entry.product_id.as_str())
                })
                .unwrap_or(target_scoped.entries.len());
            target_scoped.entries.insert(position, entry.clone());
        }
        target_scoped.stale = true;
        moved
    }

    pub fn mark_stale(&mut self, scope: &BasketScope) {
        if let Some(scoped) = self.scopes.get_mut(scope) {
            scoped.stale = true;
        }
    }

    pub fn drop_scope(&mut self, scope: &BasketScope) {
        self.scopes.remove(scope);
        if self.last_loaded_scope.as_ref() == Some(scope) {
            self.last_loaded_scope = None;
        }
    }

    pub fn clear(&mut self) {
        self.scopes.clear();
        self.last_loaded_scope = None;
    }

    fn scoped_mut(&mut self, scope: &BasketScope) -> &mut ScopeEntries {
        self.scopes
            .entry(scope.clone())
            .or_insert_with(ScopeEntries::new)
    }
}
