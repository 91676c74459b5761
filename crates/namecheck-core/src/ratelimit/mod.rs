//! Per-endpoint admission control
//!
//! The limiter combines a fixed request-count window with an explicit
//! backoff. A backoff (set after a provider rate-limit response) blocks the
//! endpoint until it elapses, whatever the window counter says.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use namecheck_core::{MemoryStore, RateLimiter};
//!
//! # async fn demo() -> namecheck_core::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let limiter = RateLimiter::new(store, chrono::Duration::seconds(60), 1000);
//!
//! if limiter.allow("registry.npmjs.org").await?.is_allowed() {
//!     limiter.record("registry.npmjs.org").await?;
//!     // ... issue the request
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! `allow` and `record` are separate store round-trips. Two callers racing on
//! the same endpoint can both be admitted and one increment can be lost. The
//! safety margin absorbs that under-count.

pub mod admin;

pub use admin::RateLimitAdmin;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{RateLimitConfig, validate_safety_margin};
use crate::error::{Error, Result};
use crate::traits::{Clock, RateLimitState, Store, SystemClock};

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed
    Allowed,
    /// The request must wait
    Denied {
        /// Time until the endpoint may be retried
        retry_after: chrono::Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }

    /// Wait time before retrying; zero when allowed
    pub fn retry_after(&self) -> chrono::Duration {
        match self {
            Admission::Allowed => chrono::Duration::zero(),
            Admission::Denied { retry_after } => *retry_after,
        }
    }
}

/// Per-endpoint rate limiter backed by a [`Store`]
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    window: chrono::Duration,
    default_limit: u32,
    limits: HashMap<String, u32>,
}

impl RateLimiter {
    /// Create a limiter with one window and a default limit for every endpoint
    pub fn new(store: Arc<dyn Store>, window: chrono::Duration, default_limit: u32) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            window,
            default_limit: default_limit.max(1),
            limits: HashMap::new(),
        }
    }

    /// Build a limiter from configuration
    ///
    /// Overrides are applied first, then the safety margin scales them.
    pub fn from_config(store: Arc<dyn Store>, config: &RateLimitConfig) -> Result<Self> {
        config.validate()?;

        let mut limiter = Self::new(store, config.window(), config.default_requests_per_window);
        limiter.apply_overrides(config.overrides.clone());
        limiter.apply_safety_margin(config.safety_margin)?;
        Ok(limiter)
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Counting window length
    pub fn window(&self) -> chrono::Duration {
        self.window
    }

    /// Effective limit for an endpoint
    pub fn limit_for(&self, endpoint: &str) -> u32 {
        self.limits
            .get(endpoint)
            .copied()
            .unwrap_or(self.default_limit)
    }

    /// Administrative helpers over the same store
    pub fn admin(&self) -> RateLimitAdmin {
        RateLimitAdmin::new(self.store.clone())
    }

    /// Replace the limit for the named endpoints
    ///
    /// Endpoints not named keep their current limit.
    pub fn apply_overrides(&mut self, overrides: HashMap<String, u32>) {
        for (endpoint, limit) in overrides {
            tracing::debug!("Rate limit for {}: {} per window", endpoint, limit);
            self.limits.insert(endpoint, limit);
        }
    }

    /// Scale every configured limit down by `factor`
    ///
    /// Limits are floored and never drop below 1. The permissive default for
    /// unconfigured endpoints is left alone.
    ///
    /// # Errors
    ///
    /// `Error::Config` if `factor` is not in (0, 1].
    pub fn apply_safety_margin(&mut self, factor: f64) -> Result<()> {
        validate_safety_margin(factor)?;

        for (endpoint, limit) in self.limits.iter_mut() {
            let scaled = ((*limit as f64) * factor).floor() as u32;
            let scaled = scaled.max(1);
            if scaled != *limit {
                tracing::debug!(
                    "Safety margin {} for {}: {} -> {}",
                    factor,
                    endpoint,
                    limit,
                    scaled
                );
            }
            *limit = scaled;
        }
        Ok(())
    }

    /// Decide whether a request to `endpoint` may proceed now
    ///
    /// Does not count the request; call [`record`](Self::record) once it is
    /// actually issued.
    pub async fn allow(&self, endpoint: &str) -> Result<Admission> {
        let now = self.clock.now();

        let Some(state) = self.store.get_rate_limit(endpoint).await? else {
            return Ok(Admission::Allowed);
        };

        if let Some(until) = state.backoff_until
            && until > now
        {
            tracing::debug!("{} in backoff until {}", endpoint, until);
            return Ok(Admission::Denied {
                retry_after: until - now,
            });
        }

        let elapsed = self.elapsed(&state, now);
        if elapsed >= self.window {
            return Ok(Admission::Allowed);
        }

        let limit = self.limit_for(endpoint);
        if state.request_count >= limit {
            let retry_after = self.window - elapsed;
            tracing::debug!(
                "{} at limit ({}/{}), retry in {}s",
                endpoint,
                state.request_count,
                limit,
                retry_after.num_seconds()
            );
            return Ok(Admission::Denied { retry_after });
        }

        Ok(Admission::Allowed)
    }

    /// Count one request against `endpoint`
    ///
    /// Starts a new window when the previous one has elapsed. Backoff fields
    /// are kept as they are.
    pub async fn record(&self, endpoint: &str) -> Result<()> {
        let now = self.clock.now();
        let mut state = self
            .store
            .get_rate_limit(endpoint)
            .await?
            .unwrap_or_else(|| RateLimitState::new(endpoint, now));

        if self.elapsed(&state, now) >= self.window {
            state.window_start = now;
            state.request_count = 1;
        } else {
            state.request_count = state.request_count.saturating_add(1);
        }

        self.store.update_rate_limit(endpoint, &state).await
    }

    /// Block `endpoint` for `backoff` after a provider rate-limit response
    pub async fn record_429(&self, endpoint: &str, backoff: chrono::Duration) -> Result<()> {
        let now = self.clock.now();
        let mut state = self
            .store
            .get_rate_limit(endpoint)
            .await?
            .unwrap_or_else(|| RateLimitState::new(endpoint, now));

        state.backoff_until = Some(
            now.checked_add_signed(backoff)
                .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC),
        );
        state.last_429_at = Some(now);

        tracing::warn!(
            "{} rate limited by provider, backing off for {}s",
            endpoint,
            backoff.num_seconds()
        );
        self.store.update_rate_limit(endpoint, &state).await
    }

    /// `allow` followed by `record` when admitted
    ///
    /// Not atomic: see the module documentation.
    pub async fn acquire(&self, endpoint: &str) -> Result<Admission> {
        let admission = self.allow(endpoint).await?;
        if admission.is_allowed() {
            self.record(endpoint).await?;
        }
        Ok(admission)
    }

    /// Like [`acquire`](Self::acquire), but a denial is an error
    pub async fn acquire_or_err(&self, endpoint: &str) -> Result<()> {
        match self.acquire(endpoint).await? {
            Admission::Allowed => Ok(()),
            Admission::Denied { retry_after } => Err(Error::rate_limited(format!(
                "{} (retry after {}s)",
                endpoint,
                retry_after.num_seconds()
            ))),
        }
    }

    /// Time since the window started; a window start in the future counts as 0
    fn elapsed(
        &self,
        state: &RateLimitState,
        now: chrono::DateTime<chrono::Utc>,
    ) -> chrono::Duration {
        (now - state.window_start).max(chrono::Duration::zero())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("window", &self.window)
            .field("default_limit", &self.default_limit)
            .field("limits", &self.limits)
            .finish()
    }
}
