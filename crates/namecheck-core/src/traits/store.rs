// # Store Trait
//
// Defines the persistence interface shared by the rate limiter and the
// result cache.
//
// ## Tables
//
// - `rate_limits`: one row per endpoint, keyed by endpoint
// - `check_cache`: one row per (name, check_type, tld), expiring
//
// ## Implementations
//
// - In-memory: `MemoryStore`
// - JSON file with atomic writes: `FileStore`
// - Future: SQLite, Postgres
//
// ## Usage
//
// ```rust,ignore
// use namecheck_core::Store;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let store = /* Store implementation */;
//
//     let state = store.get_rate_limit("registry.npmjs.org").await?;
//     println!("{:?}", state);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Availability, CheckType};

/// Admission-control state for one endpoint
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RateLimitState {
    /// Endpoint key (usually a host name)
    pub endpoint: String,
    /// Requests recorded in the current window
    pub request_count: u32,
    /// Start of the current window
    pub window_start: DateTime<Utc>,
    /// Hard block after a provider rate-limit response
    pub backoff_until: Option<DateTime<Utc>>,
    /// When the provider last answered 429
    pub last_429_at: Option<DateTime<Utc>>,
}

impl RateLimitState {
    /// Fresh state with an empty window starting at `now`
    pub fn new(endpoint: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_count: 0,
            window_start: now,
            backoff_until: None,
            last_429_at: None,
        }
    }

    /// Whether a backoff is set and has not elapsed at `now`
    pub fn in_backoff(&self, now: DateTime<Utc>) -> bool {
        self.backoff_until.is_some_and(|until| until > now)
    }
}

/// One cached check outcome
///
/// Identity is (`name`, `check_type`, `tld`); `tld` is already normalized
/// (empty for non-domain types) when an entry reaches the store.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CacheEntry {
    pub name: String,
    pub check_type: CheckType,
    pub tld: String,
    pub available: Availability,
    pub status_code: Option<u16>,
    /// Extra data, serialized as a JSON object
    pub extra_data: String,
    pub message: String,
    pub checked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether this entry is still valid at `now`
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// Whether this entry has the given identity
    pub fn has_key(&self, name: &str, check_type: CheckType, tld: &str) -> bool {
        self.name == name && self.check_type == check_type && self.tld == tld
    }
}

/// Trait for persistence implementations
///
/// Backs both [`RateLimiter`](crate::RateLimiter) and
/// [`ResultCache`](crate::ResultCache). One instance is shared by every
/// concurrent worker.
///
/// # Atomicity
///
/// Each single-row write is atomic. Nothing more is promised: a
/// `get_rate_limit` followed by `update_rate_limit` from two callers can
/// lose an update.
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get the rate-limit row for an endpoint
    ///
    /// # Returns
    ///
    /// - `Ok(Some(RateLimitState))`: The stored row
    /// - `Ok(None)`: Endpoint never seen
    /// - `Err(Error)`: Storage error
    async fn get_rate_limit(&self, endpoint: &str) -> Result<Option<RateLimitState>, crate::Error>;

    /// Create or replace the rate-limit row for an endpoint
    async fn update_rate_limit(
        &self,
        endpoint: &str,
        state: &RateLimitState,
    ) -> Result<(), crate::Error>;

    /// List rate-limit rows whose endpoint starts with `prefix`
    ///
    /// An empty prefix lists every row. Rows are sorted by endpoint.
    async fn list_rate_limits(&self, prefix: &str) -> Result<Vec<RateLimitState>, crate::Error>;

    /// Delete one rate-limit row
    ///
    /// # Returns
    ///
    /// `Ok(true)` if a row was removed
    async fn delete_rate_limit(&self, endpoint: &str) -> Result<bool, crate::Error>;

    /// Delete every rate-limit row whose endpoint starts with `prefix`
    ///
    /// # Returns
    ///
    /// The number of rows removed
    async fn delete_rate_limits(&self, prefix: &str) -> Result<usize, crate::Error>;

    /// Look up a live cache row
    ///
    /// Only rows with `expires_at > now` are returned.
    async fn get_cache_entry(
        &self,
        name: &str,
        check_type: CheckType,
        tld: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry>, crate::Error>;

    /// Insert or overwrite the cache row for the entry's key
    async fn upsert_cache_entry(&self, entry: &CacheEntry) -> Result<(), crate::Error>;

    /// Delete cache rows that expired at or before `now`
    ///
    /// # Returns
    ///
    /// The number of rows removed
    async fn purge_expired_cache(&self, now: DateTime<Utc>) -> Result<usize, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_window() {
        let now = Utc::now();
        let mut state = RateLimitState::new("api.github.com", now);
        assert!(!state.in_backoff(now));

        state.backoff_until = Some(now + chrono::Duration::seconds(10));
        assert!(state.in_backoff(now));
        assert!(!state.in_backoff(now + chrono::Duration::seconds(10)));
    }
}
