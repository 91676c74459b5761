//! Contract Test: Orchestrator fan-out and failure policy
//!
//! Constraints verified:
//! - Results follow profile order: TLDs, then registries, then handles
//! - Blank entries are skipped without error
//! - Domain results carry the profile TLD, whatever the checker reported
//! - Missing checkers are skipped (lenient) or reported Unsupported (strict)
//! - Checker errors become Error results (lenient) or abort the call (strict)
//! - Provenance timestamps come from the injected clock
//!
//! If this test fails, the per-name fan-out contract is broken.

mod common;

use common::*;
use namecheck_core::types::{Availability, CheckType, Profile};
use namecheck_core::{Error, Orchestrator};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn tlds_yield_domain_results_in_order() {
    let domain = MockChecker::new(CheckType::Domain, Availability::Taken);
    let orchestrator =
        orchestrator_with(vec![Arc::new(MockChecker::sharing_counters_with(&domain))]);
    let profile = Profile::new("p").with_tlds(["com", "io"]);

    let results = assert_ok!(orchestrator.check("acme", &profile).await);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].name, "acme.com");
    assert_eq!(results[0].tld.as_deref(), Some("com"));
    assert_eq!(results[1].name, "acme.io");
    assert_eq!(results[1].tld.as_deref(), Some("io"));
    assert_eq!(domain.checked(), vec!["acme.com", "acme.io"]);
}

#[tokio::test]
async fn domain_result_carries_profile_tld() {
    let domain = MockChecker::new(CheckType::Domain, Availability::Available).reporting_tld("uk");
    let orchestrator =
        orchestrator_with(vec![Arc::new(MockChecker::sharing_counters_with(&domain))]);
    let profile = Profile::new("p").with_tlds(["co.uk"]);

    let results = assert_ok!(orchestrator.check("acme", &profile).await);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "acme.co.uk");
    assert_eq!(results[0].tld.as_deref(), Some("co.uk"));
    assert_eq!(domain.checked(), vec!["acme.co.uk"]);
}

#[tokio::test]
async fn blank_tlds_are_skipped() {
    let domain = MockChecker::new(CheckType::Domain, Availability::Available);
    let orchestrator =
        orchestrator_with(vec![Arc::new(MockChecker::sharing_counters_with(&domain))]);
    let profile = Profile::new("p").with_tlds(["", "   ", ".", "dev"]);

    let results = assert_ok!(orchestrator.check("acme", &profile).await);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "acme.dev");
    assert_eq!(domain.call_count(), 1);
}

#[tokio::test]
async fn profile_order_is_tlds_then_registries_then_handles() {
    let orchestrator = orchestrator_with(vec![
        Arc::new(SlowChecker::new(CheckType::Github)),
        Arc::new(MockChecker::new(CheckType::Npm, Availability::Taken)),
        Arc::new(MockChecker::new(CheckType::Domain, Availability::Available)),
        Arc::new(MockChecker::new(CheckType::Cargo, Availability::Unknown)),
    ]);
    let profile = Profile::new("p")
        .with_tlds(["com"])
        .with_registries(["npm", "crates.io"])
        .with_handles(["github"]);

    let results = assert_ok!(orchestrator.check("acme", &profile).await);

    let order: Vec<CheckType> = results.iter().map(|r| r.check_type).collect();
    assert_eq!(
        order,
        vec![CheckType::Domain, CheckType::Npm, CheckType::Cargo, CheckType::Github]
    );
}

#[tokio::test]
async fn missing_checker_is_skipped_when_lenient() {
    let orchestrator = orchestrator_with(vec![]);
    let profile = Profile::new("p").with_registries(["pypi"]);

    let results = assert_ok!(orchestrator.check("acme", &profile).await);
    assert!(results.is_empty());
}

#[tokio::test]
async fn missing_checker_is_unsupported_when_strict() {
    let orchestrator = orchestrator_with(vec![]).with_include_unsupported(true);
    let profile = Profile::new("p").with_registries(["pypi"]);

    let results = assert_ok!(orchestrator.check("acme", &profile).await);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].check_type, CheckType::Pypi);
    assert_eq!(results[0].available, Availability::Unsupported);
    assert_eq!(results[0].provenance.requested_at, Some(epoch()));
}

#[tokio::test]
async fn unsupported_name_is_unsupported_when_strict() {
    let npm = MockChecker::new(CheckType::Npm, Availability::Available).rejecting("Bad Name");
    let strict = orchestrator_with(vec![Arc::new(MockChecker::sharing_counters_with(&npm))])
        .with_include_unsupported(true);
    let profile = Profile::new("p").with_registries(["npm"]);

    let results = assert_ok!(strict.check("Bad Name", &profile).await);

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].available, Availability::Unsupported);
    assert_eq!(npm.call_count(), 0);
}

#[tokio::test]
async fn unsupported_name_is_skipped_when_lenient() {
    let npm = MockChecker::new(CheckType::Npm, Availability::Available).rejecting("Bad Name");
    let lenient = orchestrator_with(vec![Arc::new(MockChecker::sharing_counters_with(&npm))]);
    let profile = Profile::new("p").with_registries(["npm"]);

    let results = assert_ok!(lenient.check("Bad Name", &profile).await);

    assert!(results.is_empty());
    assert_eq!(npm.call_count(), 0);
}

#[tokio::test]
async fn checker_error_becomes_error_result_when_lenient() {
    let orchestrator = orchestrator_with(vec![
        Arc::new(FailingChecker::always(CheckType::Npm)),
        Arc::new(MockChecker::new(CheckType::Github, Availability::Taken)),
    ]);
    let profile = Profile::new("p")
        .with_registries(["npm"])
        .with_handles(["github"]);

    let results = assert_ok!(orchestrator.check("acme", &profile).await);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].available, Availability::Error);
    assert!(results[0].message.contains("upstream unavailable"));
    assert_eq!(results[1].available, Availability::Taken);
}

#[tokio::test]
async fn checker_error_aborts_when_strict() {
    let github = MockChecker::new(CheckType::Github, Availability::Taken);
    let orchestrator = orchestrator_with(vec![
        Arc::new(FailingChecker::always(CheckType::Npm)),
        Arc::new(MockChecker::sharing_counters_with(&github)),
    ])
    .with_include_unsupported(true);
    let profile = Profile::new("p")
        .with_registries(["npm"])
        .with_handles(["github"]);

    let err = assert_err!(orchestrator.check("acme", &profile).await);

    assert!(matches!(err, Error::Checker { .. }));
    // Targets after the failure are never evaluated
    assert_eq!(github.call_count(), 0);
}

#[tokio::test]
async fn blank_name_does_no_work() {
    let domain = MockChecker::new(CheckType::Domain, Availability::Taken);
    let orchestrator =
        orchestrator_with(vec![Arc::new(MockChecker::sharing_counters_with(&domain))]);

    let err = assert_err!(orchestrator.check(" ", &Profile::new("p").with_tlds(["com"])).await);

    assert!(err.is_config());
    assert_eq!(domain.call_count(), 0);
}

#[tokio::test]
async fn provenance_is_filled_from_clock() {
    let clock = manual_clock();
    let orchestrator = Orchestrator::new(registry_with(vec![Arc::new(MockChecker::new(
        CheckType::Domain,
        Availability::Taken,
    ))]))
    .with_clock(clock.clone());

    let results = assert_ok!(
        orchestrator
            .check("acme", &Profile::new("p").with_tlds(["com"]))
            .await
    );

    assert_eq!(results[0].provenance.requested_at, Some(epoch()));
    assert_eq!(results[0].provenance.resolved_at, Some(epoch()));
    assert!(!results[0].provenance.from_cache);
}
