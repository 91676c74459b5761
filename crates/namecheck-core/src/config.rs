//! Configuration types for namecheck
//!
//! This module defines all configuration structures used throughout the crate.
//! Every field has a default, so an empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Availability, Profile};

/// Main namecheck configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamecheckConfig {
    /// What to check for each candidate name
    #[serde(default = "default_profile")]
    pub profile: Profile,

    /// Orchestrator policy
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Rate limiter settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Cache TTL policy used by checkers
    #[serde(default)]
    pub cache: CacheTtlConfig,

    /// Batch runner settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Persistence backend
    #[serde(default)]
    pub store: StoreConfig,
}

impl NamecheckConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            profile: default_profile(),
            orchestrator: OrchestratorConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheTtlConfig::default(),
            batch: BatchConfig::default(),
            store: StoreConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.profile.is_empty() {
            return Err(crate::Error::config(format!(
                "Profile '{}' has no TLDs, registries or handles",
                self.profile.name
            )));
        }

        self.rate_limit.validate()?;
        self.batch.validate()?;
        self.store.validate()?;

        Ok(())
    }
}

impl Default for NamecheckConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_profile() -> Profile {
    Profile::preset("default").unwrap_or_default()
}

/// Orchestrator configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Emit `Unsupported` results for targets without a usable checker
    ///
    /// This also switches checker errors from being recorded as `Error`
    /// results to aborting the whole check.
    #[serde(default)]
    pub include_unsupported: bool,
}

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Length of the counting window (in seconds)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Limit for endpoints without an override
    ///
    /// Deliberately permissive; real provider quotas belong in `overrides`.
    #[serde(default = "default_requests_per_window")]
    pub default_requests_per_window: u32,

    /// Per-endpoint limits, keyed by endpoint (host name)
    #[serde(default)]
    pub overrides: HashMap<String, u32>,

    /// Fraction of each configured limit actually used
    ///
    /// Must be in (0, 1]. 0.9 leaves 10% headroom.
    #[serde(default = "default_safety_margin")]
    pub safety_margin: f64,
}

impl RateLimitConfig {
    /// Counting window as a duration
    pub fn window(&self) -> chrono::Duration {
        secs_to_duration(self.window_secs)
    }

    /// Validate the rate limit configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.window_secs == 0 {
            return Err(crate::Error::config("Rate limit window must be > 0"));
        }
        if self.default_requests_per_window == 0 {
            return Err(crate::Error::config(
                "Default requests per window must be > 0",
            ));
        }
        if let Some((endpoint, _)) = self.overrides.iter().find(|(_, limit)| **limit == 0) {
            return Err(crate::Error::config(format!(
                "Rate limit override for '{}' must be > 0",
                endpoint
            )));
        }
        validate_safety_margin(self.safety_margin)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            default_requests_per_window: default_requests_per_window(),
            overrides: HashMap::new(),
            safety_margin: default_safety_margin(),
        }
    }
}

/// Saturating conversion for configured second counts
fn secs_to_duration(secs: u64) -> chrono::Duration {
    chrono::Duration::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX))
        .unwrap_or(chrono::Duration::MAX)
}

pub(crate) fn validate_safety_margin(factor: f64) -> Result<(), crate::Error> {
    if factor.is_finite() && factor > 0.0 && factor <= 1.0 {
        Ok(())
    } else {
        Err(crate::Error::config(format!(
            "Safety margin must be in (0, 1], got {}",
            factor
        )))
    }
}

fn default_window_secs() -> u64 {
    60
}

fn default_requests_per_window() -> u32 {
    1000
}

fn default_safety_margin() -> f64 {
    0.9
}

/// Cache TTL per outcome (in seconds)
///
/// A TTL of 0 means "do not cache".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheTtlConfig {
    #[serde(default = "default_available_secs")]
    pub available_secs: u64,

    #[serde(default = "default_taken_secs")]
    pub taken_secs: u64,

    /// Also used for `Unsupported`
    #[serde(default)]
    pub unknown_secs: u64,

    #[serde(default)]
    pub error_secs: u64,

    #[serde(default)]
    pub rate_limited_secs: u64,
}

impl CacheTtlConfig {
    /// TTL to cache a result with the given outcome
    pub fn ttl_for(&self, available: Availability) -> chrono::Duration {
        let secs = match available {
            Availability::Available => self.available_secs,
            Availability::Taken => self.taken_secs,
            Availability::Unknown | Availability::Unsupported => self.unknown_secs,
            Availability::Error => self.error_secs,
            Availability::RateLimited => self.rate_limited_secs,
        };
        secs_to_duration(secs)
    }

    /// Cache nothing
    pub fn disabled() -> Self {
        Self {
            available_secs: 0,
            taken_secs: 0,
            unknown_secs: 0,
            error_secs: 0,
            rate_limited_secs: 0,
        }
    }
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            available_secs: default_available_secs(),
            taken_secs: default_taken_secs(),
            unknown_secs: 0,
            error_secs: 0,
            rate_limited_secs: 0,
        }
    }
}

fn default_available_secs() -> u64 {
    15 * 60
}

fn default_taken_secs() -> u64 {
    24 * 60 * 60
}

/// Batch runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of names checked at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl BatchConfig {
    /// Validate the batch configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.concurrency == 0 {
            return Err(crate::Error::config("Batch concurrency must be > 0"));
        }
        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Store configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// File-based store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("File store path cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::File { .. } => "file",
            StoreConfig::Memory => "memory",
        }
    }
}
