// # Memory Store
//
// In-memory implementation of Store.
//
// ## Purpose
//
// Fast, process-local persistence for one-shot runs and tests. Rate-limit
// counters and cached results vanish when the process exits.
//
// ## When to Use
//
// - Testing environments
// - Single invocations where a warm cache does not matter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::store::{CacheEntry, RateLimitState, Store};
use crate::types::CheckType;

/// Composite cache identity
pub(crate) type CacheKey = (String, CheckType, String);

pub(crate) fn cache_key(entry: &CacheEntry) -> CacheKey {
    (entry.name.clone(), entry.check_type, entry.tld.clone())
}

#[derive(Debug, Default)]
struct Tables {
    rate_limits: HashMap<String, RateLimitState>,
    check_cache: HashMap<CacheKey, CacheEntry>,
}

/// In-memory store implementation
///
/// Both tables live in HashMaps behind one RwLock. Every single-row write
/// holds the write lock for its duration, which makes it atomic.
///
/// # Example
///
/// ```rust,no_run
/// use namecheck_core::state::MemoryStore;
/// use namecheck_core::traits::{RateLimitState, Store};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///     let state = RateLimitState::new("registry.npmjs.org", chrono::Utc::now());
///
///     store.update_rate_limit("registry.npmjs.org", &state).await?;
///     assert!(store.get_rate_limit("registry.npmjs.org").await?.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cache rows, live or expired
    pub async fn cache_len(&self) -> usize {
        self.inner.read().await.check_cache.len()
    }

    /// Number of rate-limit rows
    pub async fn rate_limit_len(&self) -> usize {
        self.inner.read().await.rate_limits.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_rate_limit(&self, endpoint: &str) -> Result<Option<RateLimitState>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.rate_limits.get(endpoint).cloned())
    }

    async fn update_rate_limit(&self, endpoint: &str, state: &RateLimitState) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard
            .rate_limits
            .insert(endpoint.to_string(), state.clone());
        Ok(())
    }

    async fn list_rate_limits(&self, prefix: &str) -> Result<Vec<RateLimitState>, Error> {
        let guard = self.inner.read().await;
        let mut rows: Vec<RateLimitState> = guard
            .rate_limits
            .values()
            .filter(|state| state.endpoint.starts_with(prefix))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        Ok(rows)
    }

    async fn delete_rate_limit(&self, endpoint: &str) -> Result<bool, Error> {
        let mut guard = self.inner.write().await;
        Ok(guard.rate_limits.remove(endpoint).is_some())
    }

    async fn delete_rate_limits(&self, prefix: &str) -> Result<usize, Error> {
        let mut guard = self.inner.write().await;
        let before = guard.rate_limits.len();
        guard
            .rate_limits
            .retain(|endpoint, _| !endpoint.starts_with(prefix));
        Ok(before - guard.rate_limits.len())
    }

    async fn get_cache_entry(
        &self,
        name: &str,
        check_type: CheckType,
        tld: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, Error> {
        let guard = self.inner.read().await;
        let key = (name.to_string(), check_type, tld.to_string());
        Ok(guard
            .check_cache
            .get(&key)
            .filter(|entry| entry.is_live(now))
            .cloned())
    }

    async fn upsert_cache_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.check_cache.insert(cache_key(entry), entry.clone());
        Ok(())
    }

    async fn purge_expired_cache(&self, now: DateTime<Utc>) -> Result<usize, Error> {
        let mut guard = self.inner.write().await;
        let before = guard.check_cache.len();
        guard.check_cache.retain(|_, entry| entry.is_live(now));
        Ok(before - guard.check_cache.len())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }
}
