use std::time::Duration;

/// How long cached entries for a scope stay fresh before `should_reload`
/// asks for a refetch. Tunable, not an invariant.
pub const DEFAULT_FRESHNESS_SECS: u64 = 60;

/// Upper bound on how long `load_next_page` waits for the page fetch before
/// force-clearing the loading flag. The fetch itself is not cancelled.
pub const DEFAULT_LOAD_TIMEOUT_MILLIS: u64 = 5_000;

#[derive(Debug, Clone, Copy)]
pub struct FavoritesConfig {
    pub freshness: Duration,
    pub load_timeout: Duration,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(DEFAULT_FRESHNESS_SECS),
            load_timeout: Duration::from_millis(DEFAULT_LOAD_TIMEOUT_MILLIS),
        }
    }
}

impl FavoritesConfig {
    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn with_load_timeout(mut self, load_timeout: Duration) -> Self {
        self.load_timeout = load_timeout;
        self
    }
}
