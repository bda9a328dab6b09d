//! Installation token caching keyed by organization.
//!
//! Caching is an optimization only: every method is infallible, a miss just
//! means the broker does the full mint-and-exchange again. Tokens are keyed
//! by lowercased organization login and served only while they have at least
//! five minutes of lifetime left, so a cached token never expires mid-flight.

use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Clock, InstallationToken, SystemClock};

/// Minimum remaining lifetime before a cached token is considered stale.
const FRESHNESS_MARGIN_MINUTES: i64 = 5;

/// Cache for installation tokens, keyed by organization login.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Get a token for `org` that is still fresh enough to use.
    async fn get(&self, org: &str) -> Option<InstallationToken>;

    /// Store a token for `org`, replacing any previous entry.
    async fn store(&self, org: &str, token: InstallationToken);

    /// Drop any token held for `org`.
    async fn invalidate(&self, org: &str);
}

/// Thread-safe in-memory token cache.
pub struct InMemoryTokenCache {
    entries: RwLock<HashMap<String, InstallationToken>>,
    clock: Arc<dyn Clock>,
    freshness_margin: Duration,
}

impl InMemoryTokenCache {
    /// Create a cache using the system clock and the default freshness
    /// margin.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            freshness_margin: Duration::minutes(FRESHNESS_MARGIN_MINUTES),
        }
    }

    /// Organization logins are case-insensitive; normalize the key so mixed
    /// casings hit the same entry.
    fn cache_key(org: &str) -> String {
        org.to_ascii_lowercase()
    }

    fn is_fresh(&self, token: &InstallationToken) -> bool {
        token.expires_at() - self.freshness_margin > self.clock.now()
    }
}

impl Default for InMemoryTokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn get(&self, org: &str) -> Option<InstallationToken> {
        let entries = self.entries.read().await;
        entries
            .get(&Self::cache_key(org))
            .filter(|token| self.is_fresh(token))
            .cloned()
    }

    async fn store(&self, org: &str, token: InstallationToken) {
        let mut entries = self.entries.write().await;
        entries.insert(Self::cache_key(org), token);
    }

    async fn invalidate(&self, org: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(&Self::cache_key(org));
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
