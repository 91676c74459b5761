//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal checkers that verify orchestration and
//! batching contracts without talking to any real provider.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use namecheck_core::error::{Error, Result};
use namecheck_core::traits::{Checker, ManualClock};
use namecheck_core::types::{Availability, CheckResult, CheckType};
use namecheck_core::{CheckerRegistry, Orchestrator};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fixed starting point for deterministic clocks
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 9, 12, 0, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(epoch()))
}

/// A checker that always answers the same outcome and tracks calls
pub struct MockChecker {
    check_type: CheckType,
    answer: Availability,
    /// Names rejected by supports_name()
    rejected: Vec<String>,
    /// TLD stamped on every result
    tld: Option<String>,
    /// Call counter for check()
    call_count: Arc<AtomicUsize>,
    /// Names passed to check(), in call order
    checked: Arc<Mutex<Vec<String>>>,
}

impl MockChecker {
    pub fn new(check_type: CheckType, answer: Availability) -> Self {
        Self {
            check_type,
            answer,
            rejected: Vec::new(),
            tld: None,
            call_count: Arc::new(AtomicUsize::new(0)),
            checked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make supports_name() return false for `name`
    pub fn rejecting(mut self, name: &str) -> Self {
        self.rejected.push(name.to_string());
        self
    }

    /// Report `tld` on every result instead of leaving it empty
    pub fn reporting_tld(mut self, tld: &str) -> Self {
        self.tld = Some(tld.to_string());
        self
    }

    /// Get the number of times check() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get the names passed to check()
    pub fn checked(&self) -> Vec<String> {
        self.checked.lock().unwrap().clone()
    }

    /// Create a new MockChecker that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            check_type: other.check_type,
            answer: other.answer,
            rejected: other.rejected.clone(),
            tld: other.tld.clone(),
            call_count: Arc::clone(&other.call_count),
            checked: Arc::clone(&other.checked),
        }
    }
}

#[async_trait]
impl Checker for MockChecker {
    async fn check(&self, name: &str) -> Result<CheckResult> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.checked.lock().unwrap().push(name.to_string());

        let mut result = CheckResult::new(name, self.check_type, self.answer).with_message("mock");
        result.tld = self.tld.clone();
        Ok(result)
    }

    fn check_type(&self) -> CheckType {
        self.check_type
    }

    fn supports_name(&self, name: &str) -> bool {
        !self.rejected.iter().any(|r| r == name)
    }
}

/// A checker that fails, either always or for names containing a marker
pub struct FailingChecker {
    check_type: CheckType,
    /// Fail only when the checked name contains this; None fails everything
    fail_on: Option<String>,
}

impl FailingChecker {
    pub fn always(check_type: CheckType) -> Self {
        Self {
            check_type,
            fail_on: None,
        }
    }

    pub fn on(check_type: CheckType, marker: &str) -> Self {
        Self {
            check_type,
            fail_on: Some(marker.to_string()),
        }
    }
}

#[async_trait]
impl Checker for FailingChecker {
    async fn check(&self, name: &str) -> Result<CheckResult> {
        let fails = self
            .fail_on
            .as_deref()
            .is_none_or(|marker| name.contains(marker));

        if fails {
            Err(Error::checker(self.check_type.as_str(), "upstream unavailable"))
        } else {
            Ok(CheckResult::new(name, self.check_type, Availability::Taken))
        }
    }

    fn check_type(&self) -> CheckType {
        self.check_type
    }

    fn supports_name(&self, _name: &str) -> bool {
        true
    }
}

/// A checker that sleeps before answering, per name
pub struct SlowChecker {
    check_type: CheckType,
    delays: HashMap<String, Duration>,
    /// Names in completion order
    completed: Arc<Mutex<Vec<String>>>,
    /// Number of checks running right now, and the highest value seen
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl SlowChecker {
    pub fn new(check_type: CheckType) -> Self {
        Self {
            check_type,
            delays: HashMap::new(),
            completed: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay checks of `name` by `delay`
    pub fn delaying(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Create a new SlowChecker that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            check_type: other.check_type,
            delays: other.delays.clone(),
            completed: Arc::clone(&other.completed),
            in_flight: Arc::clone(&other.in_flight),
            max_in_flight: Arc::clone(&other.max_in_flight),
        }
    }
}

#[async_trait]
impl Checker for SlowChecker {
    async fn check(&self, name: &str) -> Result<CheckResult> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = self
            .delays
            .get(name)
            .copied()
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.lock().unwrap().push(name.to_string());

        Ok(CheckResult::new(name, self.check_type, Availability::Available))
    }

    fn check_type(&self) -> CheckType {
        self.check_type
    }

    fn supports_name(&self, _name: &str) -> bool {
        true
    }
}

/// Registry holding the given checkers
pub fn registry_with(checkers: Vec<Arc<dyn Checker>>) -> Arc<CheckerRegistry> {
    let registry = CheckerRegistry::new();
    for checker in checkers {
        registry.register(checker);
    }
    Arc::new(registry)
}

/// Lenient orchestrator over the given checkers with a manual clock
pub fn orchestrator_with(checkers: Vec<Arc<dyn Checker>>) -> Orchestrator {
    Orchestrator::new(registry_with(checkers)).with_clock(manual_clock())
}
