//! Contract Test: Rate limiter admission control
//!
//! Constraints verified:
//! - A fresh endpoint is admitted with no wait
//! - Reaching the limit denies with the remainder of the window
//! - A provider backoff overrides the window counter until it elapses
//! - The safety margin floors configured limits
//! - Admin helpers reset stored state
//!
//! If this test fails, provider quotas can be exceeded.

mod common;

use common::*;
use namecheck_core::ratelimit::Admission;
use namecheck_core::{MemoryStore, RateLimiter};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_test::assert_ok;

const ENDPOINT: &str = "registry.npmjs.org";

fn limiter_with_limit(limit: u32) -> (RateLimiter, Arc<namecheck_core::traits::ManualClock>) {
    let clock = manual_clock();
    let mut limiter = RateLimiter::new(
        Arc::new(MemoryStore::new()),
        chrono::Duration::seconds(60),
        1000,
    )
    .with_clock(clock.clone());
    limiter.apply_overrides(HashMap::from([(ENDPOINT.to_string(), limit)]));
    (limiter, clock)
}

#[tokio::test]
async fn fresh_endpoint_is_allowed_without_wait() {
    let (limiter, _clock) = limiter_with_limit(5);

    let admission = assert_ok!(limiter.allow(ENDPOINT).await);

    assert!(admission.is_allowed());
    assert_eq!(admission.retry_after(), chrono::Duration::zero());
}

#[tokio::test]
async fn limit_reached_denies_for_remaining_window() {
    let (limiter, clock) = limiter_with_limit(3);

    for _ in 0..3 {
        assert!(assert_ok!(limiter.allow(ENDPOINT).await).is_allowed());
        assert_ok!(limiter.record(ENDPOINT).await);
    }

    clock.advance(chrono::Duration::seconds(20));
    let admission = assert_ok!(limiter.allow(ENDPOINT).await);

    assert_eq!(
        admission,
        Admission::Denied {
            retry_after: chrono::Duration::seconds(40)
        }
    );

    // Other endpoints are unaffected
    assert!(assert_ok!(limiter.allow("pypi.org").await).is_allowed());
}

#[tokio::test]
async fn record_429_blocks_regardless_of_window() {
    let (limiter, _clock) = limiter_with_limit(100);

    assert_ok!(
        limiter
            .record_429(ENDPOINT, chrono::Duration::seconds(30))
            .await
    );
    let admission = assert_ok!(limiter.allow(ENDPOINT).await);

    assert!(!admission.is_allowed());
    assert_eq!(admission.retry_after(), chrono::Duration::seconds(30));
}

#[tokio::test]
async fn backoff_outlives_window_reset() {
    let (limiter, clock) = limiter_with_limit(100);

    assert_ok!(limiter.record(ENDPOINT).await);
    assert_ok!(
        limiter
            .record_429(ENDPOINT, chrono::Duration::seconds(90))
            .await
    );

    // Window has elapsed, backoff has not
    clock.advance(chrono::Duration::seconds(61));
    let admission = assert_ok!(limiter.allow(ENDPOINT).await);
    assert_eq!(admission.retry_after(), chrono::Duration::seconds(29));

    clock.advance(chrono::Duration::seconds(29));
    assert!(assert_ok!(limiter.allow(ENDPOINT).await).is_allowed());
}

#[tokio::test]
async fn safety_margin_floors_configured_limit() {
    let (mut limiter, _clock) = limiter_with_limit(10);

    assert_ok!(limiter.apply_safety_margin(0.9));
    assert_eq!(limiter.limit_for(ENDPOINT), 9);

    for _ in 0..9 {
        assert_ok!(limiter.record(ENDPOINT).await);
    }
    assert!(!assert_ok!(limiter.allow(ENDPOINT).await).is_allowed());
}

#[tokio::test]
async fn admin_reset_clears_backoff() {
    let (limiter, _clock) = limiter_with_limit(10);
    assert_ok!(
        limiter
            .record_429(ENDPOINT, chrono::Duration::hours(1))
            .await
    );

    let admin = limiter.admin();
    assert_eq!(assert_ok!(admin.count("registry.").await), 1);
    assert!(assert_ok!(admin.reset(ENDPOINT).await));

    assert!(assert_ok!(limiter.allow(ENDPOINT).await).is_allowed());
}
