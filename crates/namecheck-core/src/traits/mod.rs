//! Core traits for namecheck
//!
//! This module defines the abstract interfaces that implementations plug into.
//!
//! - [`Checker`]: Answer availability for one provider
//! - [`Store`]: Persistence for rate-limit state and cached results
//! - [`Clock`]: Injectable time source

pub mod checker;
pub mod clock;
pub mod store;

pub use checker::Checker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{CacheEntry, RateLimitState, Store};
