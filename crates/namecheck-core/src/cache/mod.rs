//! TTL result cache
//!
//! A policy-agnostic expiring key/value layer over the `check_cache` table.
//! Callers (checkers) pick the TTL per outcome; a TTL of zero or less means
//! the result is not cached at all.
//!
//! Identity is (name, check type, TLD), with the TLD normalized on every
//! read and write and always empty for non-domain types. Writes are
//! last-write-wins.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::traits::{CacheEntry, Clock, Store, SystemClock};
use crate::types::{CheckResult, CheckType, Provenance, normalize_tld};

/// Source label on results served from the cache
pub const CACHE_SOURCE: &str = "cache";

/// Expiring cache of check results backed by a [`Store`]
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Look up a live result
    ///
    /// # Returns
    ///
    /// - `Ok(Some(result))`: Cached result with `from_cache` and
    ///   `cache_expires_at` set in its provenance
    /// - `Ok(None)`: Never written, or expired
    /// - `Err(Error)`: Storage failure
    pub async fn get_cached_result(
        &self,
        name: &str,
        check_type: CheckType,
        tld: Option<&str>,
    ) -> Result<Option<CheckResult>> {
        let now = self.clock.now();
        let tld = normalize_tld(check_type, tld);

        let entry = self
            .store
            .get_cache_entry(name, check_type, &tld, now)
            .await?;

        Ok(entry.map(|entry| {
            tracing::trace!("Cache hit: {} {} '{}'", check_type, name, tld);
            entry_to_result(entry, now)
        }))
    }

    /// Store a result for `ttl`
    ///
    /// Does nothing when `ttl <= 0`. Otherwise replaces any row with the
    /// same key.
    pub async fn set_cached_result(
        &self,
        name: &str,
        result: &CheckResult,
        ttl: chrono::Duration,
    ) -> Result<()> {
        if ttl <= chrono::Duration::zero() {
            tracing::trace!("Not caching {} {}: ttl {}", result.check_type, name, ttl);
            return Ok(());
        }

        let now = self.clock.now();
        let entry = CacheEntry {
            name: name.to_string(),
            check_type: result.check_type,
            tld: normalize_tld(result.check_type, result.tld.as_deref()),
            available: result.available,
            status_code: result.status_code,
            extra_data: serde_json::to_string(&result.extra_data)?,
            message: result.message.clone(),
            checked_at: result.provenance.resolved_at.unwrap_or(now),
            expires_at: now
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        self.store.upsert_cache_entry(&entry).await
    }

    /// Delete expired rows, returning how many were removed
    pub async fn purge_expired(&self) -> Result<usize> {
        let removed = self.store.purge_expired_cache(self.clock.now()).await?;
        if removed > 0 {
            tracing::debug!("Purged {} expired cache rows", removed);
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

fn entry_to_result(entry: CacheEntry, now: DateTime<Utc>) -> CheckResult {
    let extra_data = if entry.extra_data.is_empty() {
        HashMap::new()
    } else {
        serde_json::from_str(&entry.extra_data).unwrap_or_else(|e| {
            tracing::warn!(
                "Dropping unreadable extra data for cached {} {}: {}",
                entry.check_type,
                entry.name,
                e
            );
            HashMap::new()
        })
    };

    CheckResult {
        name: entry.name,
        check_type: entry.check_type,
        tld: (!entry.tld.is_empty()).then_some(entry.tld),
        available: entry.available,
        status_code: entry.status_code,
        message: entry.message,
        extra_data,
        provenance: Provenance {
            requested_at: Some(now),
            resolved_at: Some(entry.checked_at),
            from_cache: true,
            cache_expires_at: Some(entry.expires_at),
            source: CACHE_SOURCE.to_string(),
            server: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStore;
    use crate::traits::ManualClock;
    use crate::types::Availability;

    fn cache() -> (ResultCache, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = ResultCache::new(store.clone()).with_clock(clock.clone());
        (cache, store, clock)
    }

    #[tokio::test]
    async fn test_tld_normalized_on_read_and_write() {
        let (cache, _store, _clock) = cache();
        let result =
            CheckResult::new("acme.io", CheckType::Domain, Availability::Taken).with_tld(".IO");

        cache
            .set_cached_result("acme.io", &result, chrono::Duration::hours(1))
            .await
            .unwrap();

        let hit = cache
            .get_cached_result("acme.io", CheckType::Domain, Some(" io "))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.tld.as_deref(), Some("io"));
    }

    #[tokio::test]
    async fn test_tld_ignored_for_non_domain_types() {
        let (cache, _store, _clock) = cache();
        let result =
            CheckResult::new("acme", CheckType::Npm, Availability::Available).with_tld("com");

        cache
            .set_cached_result("acme", &result, chrono::Duration::hours(1))
            .await
            .unwrap();

        let hit = cache
            .get_cached_result("acme", CheckType::Npm, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.tld, None);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (cache, store, clock) = cache();
        let result = CheckResult::new("acme", CheckType::Cargo, Availability::Taken);
        cache
            .set_cached_result("acme", &result, chrono::Duration::seconds(10))
            .await
            .unwrap();

        assert_eq!(cache.purge_expired().await.unwrap(), 0);
        clock.advance(chrono::Duration::seconds(10));
        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert_eq!(store.cache_len().await, 0);
    }

    #[tokio::test]
    async fn test_checked_at_comes_from_resolved_at() {
        let (cache, _store, clock) = cache();
        let resolved = clock.now() - chrono::Duration::seconds(5);
        let mut result = CheckResult::new("acme", CheckType::Pypi, Availability::Available);
        result.provenance.resolved_at = Some(resolved);

        cache
            .set_cached_result("acme", &result, chrono::Duration::minutes(1))
            .await
            .unwrap();

        let hit = cache
            .get_cached_result("acme", CheckType::Pypi, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.provenance.resolved_at, Some(resolved));
        assert_eq!(hit.provenance.source, CACHE_SOURCE);
    }
}
