use std::collections::BTreeMap;

use crate::favorites::model::{BasketScope, PageCursor};

/// Cursor and exhaustion bookkeeping for one scope.
#[derive(Clone, Debug)]
pub struct PaginationState {
    pub cursor: Option<PageCursor>,
    pub has_more: bool,
    pub is_loading_more: bool,
    generation: u64,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            cursor: None,
            has_more: true,
            is_loading_more: false,
            generation: 0,
        }
    }
}

/// Outcome of asking to start a page fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BeginPage {
    /// Fetch may proceed; completions carry the generation back so a
    /// reset that happened in between invalidates them.
    Started(u64),
    /// A fetch for this scope is already in flight; the caller no-ops.
    AlreadyLoading,
    /// The scope returned a short page earlier; terminal until the scope
    /// is invalidated.
    Exhausted,
}

/// Tracks page boundaries per scope. The `is_loading_more` flag is the
/// only mutual-exclusion primitive for page fetches: checked and set
/// synchronously before any async work starts.
#[derive(Debug, Default)]
pub struct PaginationTracker {
    scopes: BTreeMap<BasketScope, PaginationState>,
}

impl PaginationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, scope: &BasketScope) -> PaginationState {
        self.scopes.get(scope).cloned().unwrap_or_default()
    }

    pub fn has_more(&self, scope: &BasketScope) -> bool {
        self.state(scope).has_more
    }

    pub fn is_loading_more(&self, scope: &BasketScope) -> bool {
        self.state(scope).is_loading_more
    }

    pub fn cursor(&self, scope: &BasketScope) -> Option<PageCursor> {
        self.state(scope).cursor
    }

    pub fn begin(&mut self, scope: &BasketScope) -> BeginPage {
        let state = self.scoped_mut(scope);
        if state.is_loading_more {
            return BeginPage::AlreadyLoading;
        }
        if !state.has_more {
            return BeginPage::Exhausted;
        }
        state.is_loading_more = true;
        BeginPage::Started(state.generation)
    }

    /// Records a finished fetch. The loading flag always clears; cursor
    /// and exhaustion only advance when the generation still matches
    /// (i.e. no reset or invalidation raced the fetch).
    pub fn complete(
        &mut self,
        scope: &BasketScope,
        generation: u64,
        cursor: Option<PageCursor>,
        fetched: usize,
        page_size: usize,
    ) {
        let state = self.scoped_mut(scope);
        state.is_loading_more = false;
        if state.generation != generation {
            return;
        }
        if let Some(cursor) = cursor {
            state.cursor = Some(cursor);
        }
        // A zero-length page is the same as a short page, not an error.
        if fetched < page_size {
            state.has_more = false;
        }
    }

    pub fn fail(&mut self, scope: &BasketScope, _generation: u64) {
        let state = self.scoped_mut(scope);
        state.is_loading_more = false;
    }

    /// Watchdog entry point: clears the loading flag without touching
    /// cursor or exhaustion, so a late completion can still land.
    pub fn force_clear_loading(&mut self, scope: &BasketScope) {
        let state = self.scoped_mut(scope);
        state.is_loading_more = false;
    }

    /// Clears cursor and exhaustion for a structural change (filter
    /// switch, forced reload). Cached entries are untouched by design;
    /// they stay visible until the next fetch overwrites them.
    pub fn reset(&mut self, scope: &BasketScope) {
        let state = self.scoped_mut(scope);
        state.cursor = None;
        state.has_more = true;
        state.is_loading_more = false;
        state.generation += 1;
    }

    /// Marks exhaustion untrusted after a mutation changed the scope's
    /// membership. The cursor survives; only `has_more` reopens.
    pub fn invalidate(&mut self, scope: &BasketScope) {
        let state = self.scoped_mut(scope);
        state.has_more = true;
        state.generation += 1;
    }

    pub fn remove_scope(&mut self, scope: &BasketScope) {
        self.scopes.remove(scope);
    }

    pub fn clear(&mut self) {
        self.scopes.clear();
    }

    fn scoped_mut(&mut self, scope: &BasketScope) -> &mut PaginationState {
        self.scopes.entry(scope.clone()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::model::{FavoriteAttributes, FavoriteDocument};
    use chrono::{TimeZone, Utc};

    fn cursor(id: &str, secs: i64) -> PageCursor {
        PageCursor::from_document(&FavoriteDocument::new(
            id,
            FavoriteAttributes::default(),
            Utc.timestamp_opt(secs, 0).unwrap(),
        ))
    }

    #[test]
    fn second_begin_while_loading_is_rejected() {
        let mut tracker = PaginationTracker::new();
        let scope = BasketScope::Default;
        assert!(matches!(tracker.begin(&scope), BeginPage::Started(_)));
        assert_eq!(tracker.begin(&scope), BeginPage::AlreadyLoading);
    }

    #[test]
    fn short_page_is_terminal_until_invalidated() {
        let mut tracker = PaginationTracker::new();
        let scope = BasketScope::Default;
        let BeginPage::Started(generation) = tracker.begin(&scope) else {
            panic!("expected start");
        };
        tracker.complete(&scope, generation, Some(cursor("p5", 50)), 5, 20);

        assert!(!tracker.has_more(&scope));
        assert_eq!(tracker.begin(&scope), BeginPage::Exhausted);

        tracker.invalidate(&scope);
        assert!(tracker.has_more(&scope));
        assert!(matches!(tracker.begin(&scope), BeginPage::Started(_)));
    }

    #[test]
    fn full_page_advances_cursor_and_keeps_more() {
        let mut tracker = PaginationTracker::new();
        let scope = BasketScope::Default;
        let BeginPage::Started(generation) = tracker.begin(&scope) else {
            panic!("expected start");
        };
        tracker.complete(&scope, generation, Some(cursor("p20", 200)), 20, 20);

        assert!(tracker.has_more(&scope));
        assert!(!tracker.is_loading_more(&scope));
        assert_eq!(tracker.cursor(&scope), Some(cursor("p20", 200)));
    }

    #[test]
    fn empty_page_exhausts_without_moving_cursor() {
        let mut tracker = PaginationTracker::new();
        let scope = BasketScope::Default;
        let BeginPage::Started(generation) = tracker.begin(&scope) else {
            panic!("expected start");
        };
        tracker.complete(&scope, generation, None, 0, 20);
        assert!(!tracker.has_more(&scope));
        assert_eq!(tracker.cursor(&scope), None);
    }

    #[test]
    fn stale_generation_clears_flag_but_not_state() {
        let mut tracker = PaginationTracker::new();
        let scope = BasketScope::Default;
        let BeginPage::Started(generation) = tracker.begin(&scope) else {
            panic!("expected start");
        };
        tracker.reset(&scope);
        tracker.complete(&scope, generation, Some(cursor("p5", 50)), 5, 20);

        assert!(!tracker.is_loading_more(&scope));
        assert!(tracker.has_more(&scope), "stale completion must not exhaust");
        assert_eq!(tracker.cursor(&scope), None, "stale cursor must not land");
    }

    #[test]
    fn reset_reopens_an_exhausted_scope() {
        let mut tracker = PaginationTracker::new();
        let scope = BasketScope::Default;
        let BeginPage::Started(generation) = tracker.begin(&scope) else {
            panic!("expected start");
        };
        tracker.complete(&scope, generation, Some(cursor("p3", 30)), 3, 20);
        assert!(!tracker.has_more(&scope));

        tracker.reset(&scope);
        assert!(tracker.has_more(&scope));
        assert_eq!(tracker.cursor(&scope), None);
    }

    #[test]
    fn force_clear_leaves_cursor_for_late_completion() {
        let mut tracker = PaginationTracker::new();
        let scope = BasketScope::Default;
        let BeginPage::Started(generation) = tracker.begin(&scope) else {
            panic!("expected start");
        };
        tracker.force_clear_loading(&scope);
        assert!(!tracker.is_loading_more(&scope));

        // The slow fetch eventually lands and still advances the cursor.
        tracker.complete(&scope, generation, Some(cursor("p20", 200)), 20, 20);
        assert_eq!(tracker.cursor(&scope), Some(cursor("p20", 200)));
        assert!(tracker.has_more(&scope));
    }
}
