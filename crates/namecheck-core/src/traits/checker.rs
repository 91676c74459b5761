// # Checker Trait
//
// Defines the interface for answering "is this name available?" for one
// provider.
//
// ## Implementations
//
// - HTTP registries, handles and RDAP: `namecheck-http` crate
// - Future: WHOIS, DNS-based domain probes, authenticated APIs
//
// ## Usage
//
// ```rust,ignore
// use namecheck_core::Checker;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let checker = /* Checker implementation */;
//
//     if checker.supports_name("acme") {
//         let result = checker.check("acme").await?;
//         println!("{}: {:?}", result.name, result.available);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::types::{CheckResult, CheckType};

/// Trait for availability checker implementations
///
/// One implementation per provider (domain, npm, pypi, ...). The
/// [`Orchestrator`](crate::Orchestrator) decides *which* checkers run and in
/// what order; a checker only answers for one name.
///
/// # Thread Safety
///
/// Implementations must be thread-safe: the batch runner calls the same
/// checker from several workers at once.
///
/// # Rate limits and caching
///
/// A checker may consult a shared [`RateLimiter`](crate::RateLimiter) and
/// [`ResultCache`](crate::ResultCache). How it does so (which endpoint key,
/// which TTL per outcome) is the checker's own policy.
///
/// # Cancellation
///
/// `check` may be dropped at any await point when the surrounding batch is
/// cancelled. Implementations must not leave shared state inconsistent
/// across await points.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Check one name
    ///
    /// For domain checkers `name` is the full domain (`acme.io`).
    ///
    /// # Returns
    ///
    /// - `Ok(CheckResult)`: An answer, including inconclusive ones
    ///   (`Unknown`, `RateLimited`)
    /// - `Err(Error)`: The provider could not be queried at all
    async fn check(&self, name: &str) -> Result<CheckResult, crate::Error>;

    /// The check type this checker answers for
    fn check_type(&self) -> CheckType;

    /// Cheap structural validation, evaluated before every `check`
    ///
    /// # Returns
    ///
    /// `true` if the name is well-formed for this provider
    fn supports_name(&self, name: &str) -> bool;
}
