// # namecheck-core
//
// Core library for checking name availability across domains, package
// registries and social handles.
//
// ## Architecture Overview
//
// - **Checker**: Trait answering availability for one (provider, name)
// - **Orchestrator**: Fans one name out over a Profile, in profile order
// - **RateLimiter**: Per-endpoint request window plus explicit backoff
// - **ResultCache**: TTL-expiring store of previous answers
// - **run_batch_checks**: Bounded worker pool over many names, fail-fast
// - **Store**: Persistence shared by the rate limiter and the cache
//
// ## Design Principles
//
// 1. **Outcomes are data**: Unknown, unsupported, error and rate-limited are
//    `Availability` values, not errors
// 2. **Plugin-Based**: Checkers are registered per check type, no if-else on providers
// 3. **Library-First**: The binary only wires configuration to these types
// 4. **Deterministic time**: Every timestamp comes from an injected Clock

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod ratelimit;
pub mod registry;
pub mod state;
pub mod traits;
pub mod types;

// Re-export core types for convenience
pub use batch::{PartialBatch, run_batch_checks, run_batch_checks_partial};
pub use cache::ResultCache;
pub use config::{CacheTtlConfig, NamecheckConfig, RateLimitConfig, StoreConfig};
pub use error::{Error, Result};
pub use orchestrator::Orchestrator;
pub use ratelimit::{Admission, RateLimitAdmin, RateLimiter};
pub use registry::CheckerRegistry;
pub use state::{FileStore, MemoryStore, open_store};
pub use traits::{Checker, Clock, Store};
pub use types::{Availability, BatchResult, CheckResult, CheckType, Profile};
