//! Contract Test: Batch runner ordering and fail-fast
//!
//! Constraints verified:
//! - Output order matches input order, not completion order
//! - No more than `concurrency` names are in flight at once
//! - Any single failure fails the whole batch with no results
//! - The partial variant keeps what completed
//! - External cancellation stops the batch
//!
//! If this test fails, batch results can be misattributed or silently lost.

mod common;

use common::*;
use namecheck_core::types::{Availability, CheckType, Profile};
use namecheck_core::{Error, Orchestrator, run_batch_checks, run_batch_checks_partial};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn npm_profile() -> Profile {
    Profile::new("p").with_registries(["npm"])
}

fn strict(checker: Arc<dyn namecheck_core::Checker>) -> Arc<Orchestrator> {
    Arc::new(orchestrator_with(vec![checker]).with_include_unsupported(true))
}

#[tokio::test]
async fn output_order_matches_input_order() {
    let slow = SlowChecker::new(CheckType::Npm).delaying("a", Duration::from_millis(150));
    let orchestrator = Arc::new(orchestrator_with(vec![Arc::new(
        SlowChecker::sharing_counters_with(&slow),
    )]));
    let token = CancellationToken::new();

    let results = assert_ok!(
        run_batch_checks(&token, orchestrator, &npm_profile(), &["a", "b", "c"], 2).await
    );

    let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert_eq!(slow.completed().last().map(String::as_str), Some("a"));
    assert!(results.iter().all(|r| r.score == 1 && r.total == 1));
}

#[tokio::test]
async fn concurrency_is_bounded() {
    let slow = SlowChecker::new(CheckType::Npm);
    let orchestrator = Arc::new(orchestrator_with(vec![Arc::new(
        SlowChecker::sharing_counters_with(&slow),
    )]));
    let token = CancellationToken::new();
    let names: Vec<String> = (0..12).map(|i| format!("name{}", i)).collect();

    let results = assert_ok!(
        run_batch_checks(&token, orchestrator, &npm_profile(), names.as_slice(), 3).await
    );

    assert_eq!(results.len(), 12);
    assert!(slow.max_in_flight() <= 3, "saw {} in flight", slow.max_in_flight());
}

#[tokio::test]
async fn single_failure_fails_whole_batch() {
    let orchestrator = strict(Arc::new(FailingChecker::on(CheckType::Npm, "bad")));
    let token = CancellationToken::new();

    let err = assert_err!(
        run_batch_checks(&token, orchestrator, &npm_profile(), &["good1", "bad", "good2"], 2).await
    );

    assert!(matches!(err, Error::Checker { .. }));
    // The caller's token is untouched; only the batch's child token was cancelled
    assert!(!token.is_cancelled());
}

#[tokio::test]
async fn blank_name_fails_whole_batch() {
    let orchestrator = Arc::new(orchestrator_with(vec![Arc::new(MockChecker::new(
        CheckType::Npm,
        Availability::Taken,
    ))]));
    let token = CancellationToken::new();

    let err = assert_err!(
        run_batch_checks(&token, orchestrator, &npm_profile(), &["ok", "  "], 1).await
    );
    assert!(err.is_config());
}

#[tokio::test]
async fn partial_variant_keeps_completed_results() {
    let orchestrator = strict(Arc::new(FailingChecker::on(CheckType::Npm, "bad")));
    let token = CancellationToken::new();

    // One worker: "first" completes before "bad" is picked up
    let batch = run_batch_checks_partial(
        &token,
        orchestrator,
        &npm_profile(),
        &["first", "bad", "never"],
        1,
    )
    .await;

    assert!(!batch.is_complete());
    assert!(matches!(batch.error, Some(Error::Checker { .. })));
    assert_eq!(batch.results.len(), 3);
    assert_eq!(batch.results[0].as_ref().map(|r| r.name.as_str()), Some("first"));
    assert!(batch.results[1].is_none());
    assert!(batch.results[2].is_none());
    assert_eq!(batch.completed().count(), 1);
}

#[tokio::test]
async fn external_cancellation_stops_batch() {
    let slow = SlowChecker::new(CheckType::Npm).delaying("stuck", Duration::from_secs(30));
    let orchestrator = Arc::new(orchestrator_with(vec![Arc::new(slow)]));
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = assert_err!(
        run_batch_checks(&token, orchestrator, &npm_profile(), &["stuck", "other"], 1).await
    );

    assert!(matches!(err, Error::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
}
