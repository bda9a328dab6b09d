//! Tests for the in-memory installation token cache.

use super::*;
use crate::auth::InstallationId;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;

/// Clock whose time only moves when a test advances it.
struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

/// Token for installation 1 expiring `minutes` after the start time.
fn token_expiring_in(minutes: i64) -> InstallationToken {
    InstallationToken::new(
        format!("ghs_expires_in_{}", minutes),
        InstallationId::new(1),
        start_time() + Duration::minutes(minutes),
    )
}

#[tokio::test]
async fn test_store_then_get_returns_token() {
    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = InMemoryTokenCache::with_clock(clock);

    cache.store("acme", token_expiring_in(60)).await;

    let hit = cache.get("acme").await;
    assert!(hit.is_some());
    assert_eq!(hit.unwrap().token(), "ghs_expires_in_60");
}

#[tokio::test]
async fn test_get_unknown_org_misses() {
    let cache = InMemoryTokenCache::new();
    assert!(cache.get("nobody").await.is_none());
}

#[tokio::test]
async fn test_org_lookup_is_case_insensitive() {
    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = InMemoryTokenCache::with_clock(clock);

    cache.store("Acme-Corp", token_expiring_in(60)).await;

    assert!(cache.get("acme-corp").await.is_some());
    assert!(cache.get("ACME-CORP").await.is_some());
}

#[tokio::test]
async fn test_token_inside_freshness_margin_is_stale() {
    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = InMemoryTokenCache::with_clock(clock);

    // Three minutes of life left is inside the five minute margin.
    cache.store("acme", token_expiring_in(3)).await;

    assert!(
        cache.get("acme").await.is_none(),
        "token closer to expiry than the margin should not be served"
    );
}

#[tokio::test]
async fn test_token_becomes_stale_as_clock_advances() {
    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = InMemoryTokenCache::with_clock(Arc::clone(&clock) as Arc<dyn Clock>);

    cache.store("acme", token_expiring_in(60)).await;
    assert!(cache.get("acme").await.is_some());

    // 56 minutes in, only 4 minutes of life remain.
    clock.advance(Duration::minutes(56));
    assert!(cache.get("acme").await.is_none());
}

#[tokio::test]
async fn test_invalidate_removes_entry() {
    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = InMemoryTokenCache::with_clock(clock);

    cache.store("acme", token_expiring_in(60)).await;
    cache.invalidate("ACME").await;

    assert!(cache.get("acme").await.is_none());
}

#[tokio::test]
async fn test_invalidate_unknown_org_is_noop() {
    let cache = InMemoryTokenCache::new();
    cache.invalidate("nobody").await;
}

#[tokio::test]
async fn test_store_replaces_previous_token() {
    let clock = Arc::new(ManualClock::new(start_time()));
    let cache = InMemoryTokenCache::with_clock(clock);

    cache.store("acme", token_expiring_in(30)).await;
    cache.store("acme", token_expiring_in(60)).await;

    let hit = cache.get("acme").await.unwrap();
    assert_eq!(hit.token(), "ghs_expires_in_60");
}
