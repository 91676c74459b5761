// # Clock
//
// Injectable time source. Every timestamp the orchestrator, rate limiter and
// cache produce comes from a `Clock`, so tests can pin and advance time.

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::RwLock;

/// Source of the current time
pub trait Clock: Send + Sync + Debug {
    /// Current wall-clock time in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock UTC time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
///
/// # Example
///
/// ```rust
/// use namecheck_core::traits::{Clock, ManualClock};
///
/// let clock = ManualClock::new(chrono::Utc::now());
/// let before = clock.now();
/// clock.advance(chrono::Duration::seconds(30));
/// assert_eq!(clock.now() - before, chrono::Duration::seconds(30));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock pinned at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Move the clock forward (or backward, for negative deltas)
    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }

    /// Jump to an absolute time
    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}
