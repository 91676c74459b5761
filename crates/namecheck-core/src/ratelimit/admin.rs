// # Rate Limit Admin
//
// Query and reset helpers over the `rate_limits` table. These are plain
// pass-throughs to the store, meant for operators clearing a stuck backoff.

use std::sync::Arc;

use crate::error::Result;
use crate::traits::{RateLimitState, Store};

/// Administrative access to rate-limit rows
#[derive(Clone)]
pub struct RateLimitAdmin {
    store: Arc<dyn Store>,
}

impl RateLimitAdmin {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Rows whose endpoint starts with `prefix`, sorted by endpoint
    pub async fn list(&self, prefix: &str) -> Result<Vec<RateLimitState>> {
        self.store.list_rate_limits(prefix).await
    }

    /// Number of rows whose endpoint starts with `prefix`
    pub async fn count(&self, prefix: &str) -> Result<usize> {
        Ok(self.store.list_rate_limits(prefix).await?.len())
    }

    /// Forget one endpoint; returns whether it existed
    pub async fn reset(&self, endpoint: &str) -> Result<bool> {
        let removed = self.store.delete_rate_limit(endpoint).await?;
        tracing::info!("Reset rate limit for {}: {}", endpoint, removed);
        Ok(removed)
    }

    /// Forget every endpoint starting with `prefix`
    pub async fn reset_prefix(&self, prefix: &str) -> Result<usize> {
        let removed = self.store.delete_rate_limits(prefix).await?;
        tracing::info!("Reset {} rate limit rows with prefix '{}'", removed, prefix);
        Ok(removed)
    }

    /// Forget every endpoint
    pub async fn reset_all(&self) -> Result<usize> {
        self.reset_prefix("").await
    }
}

impl std::fmt::Debug for RateLimitAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitAdmin").finish_non_exhaustive()
    }
}
