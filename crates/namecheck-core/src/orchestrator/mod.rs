//! Check orchestration for one candidate name
//!
//! The Orchestrator is responsible for:
//! - Expanding a [`Profile`] into concrete targets
//! - Resolving the checker for each target through the [`CheckerRegistry`]
//! - Applying the unsupported/error policy
//! - Stamping provenance timestamps from the injected [`Clock`]
//!
//! ## Flow
//!
//! ```text
//!   name + Profile
//!         │
//!         ▼
//! ┌───────────────┐   TLDs → domain targets (<name>.<tld>)
//! │     plan      │   registries, handles → CheckType via key table
//! └───────────────┘
//!         │ targets, in profile order
//!         ▼
//! ┌───────────────┐   missing checker / !supports_name → skip or Unsupported
//! │  run_checker  │   Err → Error result (lenient) or abort (strict)
//! └───────────────┘
//!         │
//!         ▼
//!   Vec<CheckResult>
//! ```
//!
//! Targets are evaluated one after another. Concurrency only exists across
//! names, in the batch runner.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::registry::CheckerRegistry;
use crate::traits::{Clock, SystemClock};
use crate::types::{Availability, CheckResult, CheckType, Profile, normalize_key};

/// Source label on results the orchestrator synthesizes itself
pub const ORCHESTRATOR_SOURCE: &str = "orchestrator";

/// One concrete check derived from a profile
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    /// Name handed to the checker (`<name>.<tld>` for domains)
    name: String,
    check_type: CheckType,
    /// Normalized TLD, domains only
    tld: Option<String>,
}

/// Fans one name out over a profile
///
/// ## Policy
///
/// With `include_unsupported = false` (the default) targets without a usable
/// checker are skipped and checker errors become `Error` results.
///
/// With `include_unsupported = true` such targets yield an `Unsupported`
/// result, and the first checker error aborts the whole call. This strict
/// mode is meant for exhaustiveness testing.
pub struct Orchestrator {
    registry: Arc<CheckerRegistry>,
    include_unsupported: bool,
    clock: Arc<dyn Clock>,
}

impl Orchestrator {
    /// Create an orchestrator in lenient mode with the system clock
    pub fn new(registry: Arc<CheckerRegistry>) -> Self {
        Self {
            registry,
            include_unsupported: false,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create an orchestrator from configuration
    pub fn from_config(registry: Arc<CheckerRegistry>, config: &OrchestratorConfig) -> Self {
        Self::new(registry).with_include_unsupported(config.include_unsupported)
    }

    /// Switch between lenient and strict mode
    pub fn with_include_unsupported(mut self, include_unsupported: bool) -> Self {
        self.include_unsupported = include_unsupported;
        self
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Time source used for provenance
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Checkers this orchestrator dispatches to
    pub fn registry(&self) -> &CheckerRegistry {
        &self.registry
    }

    pub fn include_unsupported(&self) -> bool {
        self.include_unsupported
    }

    /// Check one name against a profile
    ///
    /// Results come back in profile order: TLDs, then registries, then
    /// handles.
    ///
    /// # Errors
    ///
    /// - `Error::Config` for a blank name or a profile with nothing to check
    /// - In strict mode, the first checker error
    pub async fn check(&self, name: &str, profile: &Profile) -> Result<Vec<CheckResult>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::config("name must not be empty"));
        }
        if profile.is_empty() {
            return Err(Error::config(format!(
                "profile '{}' has no TLDs, registries or handles",
                profile.name
            )));
        }

        let targets = plan(name, profile);
        debug!(
            "Checking '{}' against profile '{}': {} targets",
            name,
            profile.name,
            targets.len()
        );

        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            if let Some(result) = self.run_checker(target).await? {
                results.push(result);
            }
        }

        Ok(results)
    }

    /// Evaluate one target
    ///
    /// # Returns
    ///
    /// - `Ok(Some(result))`: The target produced a result
    /// - `Ok(None)`: The target was skipped
    /// - `Err(Error)`: Strict mode and the checker failed
    async fn run_checker(&self, target: Target) -> Result<Option<CheckResult>> {
        let checker = self
            .registry
            .get(target.check_type)
            .filter(|checker| checker.supports_name(&target.name));

        let Some(checker) = checker else {
            if !self.include_unsupported {
                debug!(
                    "Skipping {} '{}': no checker or name not supported",
                    target.check_type, target.name
                );
                return Ok(None);
            }

            let message = if self.registry.has(target.check_type) {
                format!("{} checker does not support this name", target.check_type)
            } else {
                format!("no {} checker configured", target.check_type)
            };
            return Ok(Some(self.synthesize(target, Availability::Unsupported, message)));
        };

        let requested_at = self.clock.now();
        match checker.check(&target.name).await {
            Ok(mut result) => {
                let provenance = &mut result.provenance;
                if provenance.requested_at.is_none() {
                    provenance.requested_at = Some(requested_at);
                }
                if provenance.resolved_at.is_none() {
                    provenance.resolved_at = Some(self.clock.now());
                }
                // Cache rows and reports are keyed by the profile TLD
                if target.check_type == CheckType::Domain {
                    result.tld = target.tld;
                }
                Ok(Some(result))
            }
            Err(e) if self.include_unsupported => Err(e),
            Err(e) => {
                warn!(
                    "{} check for '{}' failed: {}",
                    target.check_type, target.name, e
                );
                let mut result = self.synthesize(target, Availability::Error, e.to_string());
                result.provenance.requested_at = Some(requested_at);
                Ok(Some(result))
            }
        }
    }

    fn synthesize(&self, target: Target, available: Availability, message: String) -> CheckResult {
        let now = self.clock.now();
        let mut result =
            CheckResult::new(target.name, target.check_type, available).with_message(message);
        result.tld = target.tld;
        result.provenance.requested_at = Some(now);
        result.provenance.resolved_at = Some(now);
        result.provenance.source = ORCHESTRATOR_SOURCE.to_string();
        result
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("include_unsupported", &self.include_unsupported)
            .field("clock", &self.clock)
            .finish()
    }
}

/// Expand a profile into targets, in profile order
fn plan(name: &str, profile: &Profile) -> Vec<Target> {
    let domains = profile
        .tlds
        .iter()
        .map(|tld| normalize_key(tld))
        .filter(|tld| !tld.is_empty())
        .map(|tld| Target {
            name: format!("{}.{}", name, tld),
            check_type: CheckType::Domain,
            tld: Some(tld),
        });

    let keyed = profile
        .registries
        .iter()
        .chain(profile.handles.iter())
        .filter(|key| !key.trim().is_empty())
        .filter_map(|key| match CheckType::from_key(key) {
            Some(check_type) => Some(Target {
                name: name.to_string(),
                check_type,
                tld: None,
            }),
            None => {
                debug!("Dropping unknown registry/handle key '{}'", key);
                None
            }
        });

    domains.chain(keyed).collect()
}
