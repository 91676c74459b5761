//! Core data model: check types, availability outcomes, results and profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// What kind of namespace a check targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    /// A domain name (`<name>.<tld>`)
    Domain,
    /// npm package registry
    Npm,
    /// Python package index
    Pypi,
    /// crates.io
    Cargo,
    /// RubyGems
    Gem,
    /// GitHub user or organization
    Github,
    /// GitLab user or group
    Gitlab,
    /// Twitter / X handle
    Twitter,
    /// Reddit user
    Reddit,
}

/// Registry and handle keys accepted in a profile, after normalization.
///
/// `domain` is deliberately absent: domains come from the TLD list.
const CHECK_TYPE_KEYS: &[(&str, CheckType)] = &[
    ("npm", CheckType::Npm),
    ("pypi", CheckType::Pypi),
    ("cargo", CheckType::Cargo),
    ("crates", CheckType::Cargo),
    ("crates.io", CheckType::Cargo),
    ("gem", CheckType::Gem),
    ("rubygems", CheckType::Gem),
    ("github", CheckType::Github),
    ("gitlab", CheckType::Gitlab),
    ("twitter", CheckType::Twitter),
    ("x", CheckType::Twitter),
    ("reddit", CheckType::Reddit),
];

impl CheckType {
    /// Resolve a registry or handle key from a profile
    ///
    /// Returns `None` for keys that are not in the static table; callers
    /// drop those silently.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = normalize_key(key);
        CHECK_TYPE_KEYS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, check_type)| *check_type)
    }

    /// Canonical lowercase name, as used in cache keys and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::Domain => "domain",
            CheckType::Npm => "npm",
            CheckType::Pypi => "pypi",
            CheckType::Cargo => "cargo",
            CheckType::Gem => "gem",
            CheckType::Github => "github",
            CheckType::Gitlab => "gitlab",
            CheckType::Twitter => "twitter",
            CheckType::Reddit => "reddit",
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single check
///
/// Every degree of certainty is a value here. Callers branch on it instead
/// of catching errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// The name is free
    Available,
    /// The name is registered
    Taken,
    /// The provider answered but the answer was inconclusive
    Unknown,
    /// No checker is configured for this target, or it rejects the name
    Unsupported,
    /// The checker failed
    Error,
    /// The provider (or our own limiter) refused the request
    RateLimited,
}

impl Availability {
    /// Available or taken: a confirmed answer
    pub fn is_decided(&self) -> bool {
        matches!(self, Availability::Available | Availability::Taken)
    }

    /// Unknown or unsupported
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Availability::Unknown | Availability::Unsupported)
    }
}

/// Where a result came from and when
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub requested_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub from_cache: bool,
    pub cache_expires_at: Option<DateTime<Utc>>,
    /// Provider or component that produced the answer (e.g. "rdap", "cache")
    pub source: String,
    /// Concrete server that answered, if any
    pub server: String,
}

/// Result of checking one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Checked name; for domains this is the full `<name>.<tld>`
    pub name: String,
    pub check_type: CheckType,
    /// Normalized TLD, only set for domain checks
    pub tld: Option<String>,
    pub available: Availability,
    /// Provider status code (usually HTTP), when one exists
    pub status_code: Option<u16>,
    pub message: String,
    /// Provider-specific extra data
    #[serde(default)]
    pub extra_data: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl CheckResult {
    /// Create a result with empty message, extra data and provenance
    pub fn new(name: impl Into<String>, check_type: CheckType, available: Availability) -> Self {
        Self {
            name: name.into(),
            check_type,
            tld: None,
            available,
            status_code: None,
            message: String::new(),
            extra_data: HashMap::new(),
            provenance: Provenance::default(),
        }
    }

    /// Set the TLD
    pub fn with_tld(mut self, tld: impl Into<String>) -> Self {
        self.tld = Some(tld.into());
        self
    }

    /// Set the status code
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Set the message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach one extra data entry
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra_data.insert(key.into(), value);
        self
    }
}

/// Fan-out plan for one candidate name
///
/// Order matters: results come back TLDs first, then registries, then
/// handles, each in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub tlds: Vec<String>,
    #[serde(default)]
    pub registries: Vec<String>,
    #[serde(default)]
    pub handles: Vec<String>,
}

impl Profile {
    /// Create an empty profile
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the TLD list
    pub fn with_tlds<I, S>(mut self, tlds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tlds = tlds.into_iter().map(Into::into).collect();
        self
    }

    /// Set the registry list
    pub fn with_registries<I, S>(mut self, registries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registries = registries.into_iter().map(Into::into).collect();
        self
    }

    /// Set the handle list
    pub fn with_handles<I, S>(mut self, handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.handles = handles.into_iter().map(Into::into).collect();
        self
    }

    /// No TLDs, registries or handles at all
    pub fn is_empty(&self) -> bool {
        self.tlds.is_empty() && self.registries.is_empty() && self.handles.is_empty()
    }

    /// Built-in profiles
    pub fn preset(name: &str) -> Option<Self> {
        let profile = match normalize_key(name).as_str() {
            "default" => Profile::new("default")
                .with_tlds(["com", "io", "dev"])
                .with_registries(["npm", "cargo"])
                .with_handles(["github"]),
            "dev" => Profile::new("dev")
                .with_tlds(["dev", "io"])
                .with_registries(["npm", "pypi", "cargo"])
                .with_handles(["github", "gitlab"]),
            "startup" => Profile::new("startup")
                .with_tlds(["com", "io", "co", "ai", "app"])
                .with_registries(["npm"])
                .with_handles(["github", "twitter"]),
            "minimal" => Profile::new("minimal").with_tlds(["com"]),
            _ => return None,
        };
        Some(profile)
    }
}

/// Aggregate for one candidate name in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub name: String,
    pub results: Vec<CheckResult>,
    /// Number of `Available` results
    pub score: usize,
    /// Number of decided (available or taken) results
    pub total: usize,
    /// Number of `Unknown` or `Unsupported` results
    pub unknown: usize,
    pub completed_at: DateTime<Utc>,
}

impl BatchResult {
    /// Build the aggregate and its counters from a result list
    pub fn from_results(
        name: impl Into<String>,
        results: Vec<CheckResult>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let score = results
            .iter()
            .filter(|r| r.available == Availability::Available)
            .count();
        let total = results.iter().filter(|r| r.available.is_decided()).count();
        let unknown = results
            .iter()
            .filter(|r| r.available.is_inconclusive())
            .count();

        Self {
            name: name.into(),
            results,
            score,
            total,
            unknown,
            completed_at,
        }
    }
}

/// Trim, lowercase and strip a leading dot
pub fn normalize_key(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('.')
        .unwrap_or(trimmed)
        .trim()
        .to_lowercase()
}

/// Cache-key form of a TLD: normalized for domains, empty for everything else
pub fn normalize_tld(check_type: CheckType, tld: Option<&str>) -> String {
    match (check_type, tld) {
        (CheckType::Domain, Some(tld)) => normalize_key(tld),
        _ => String::new(),
    }
}
