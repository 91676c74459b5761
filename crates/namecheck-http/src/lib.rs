// # HTTP Checkers
//
// This crate provides HTTP-backed checker implementations for namecheck:
// npm, PyPI, crates.io, GitHub and RDAP for domains.
//
// ## Behavior
//
// - One GET per check, against a URL template containing `{name}`
// - Optional per-endpoint admission control through `RateLimiter`
// - Optional answer reuse through `ResultCache`, with a TTL per outcome
// - HTTP timeout configured (30 seconds by default)
// - NO retries: a failed transport is an error for the orchestrator to handle
// - NO background tasks
//
// ## Status Mapping
//
// | Status | Outcome |
// |--------|---------|
// | 404 | Available |
// | 2xx | Taken |
// | 429 | RateLimited, endpoint backed off for `Retry-After` (default 60s) |
// | other | Unknown |
//
// ## Security Requirements
//
// - Bearer tokens NEVER appear in logs or Debug output

pub mod rules;

use async_trait::async_trait;
use namecheck_core::ratelimit::Admission;
use namecheck_core::traits::Checker;
use namecheck_core::types::{Availability, CheckResult, CheckType};
use namecheck_core::{CacheTtlConfig, CheckerRegistry, Error, RateLimiter, Result, ResultCache};
use reqwest::header::{ACCEPT, RETRY_AFTER};
use std::sync::Arc;
use std::time::Duration;

/// Default HTTP timeout for lookups (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Backoff applied after a 429 without a usable `Retry-After`
const DEFAULT_429_BACKOFF_SECS: i64 = 60;

/// Extra data key carrying the suggested wait, in seconds
pub const RETRY_AFTER_KEY: &str = "retry_after_secs";

const USER_AGENT: &str = concat!("namecheck/", env!("CARGO_PKG_VERSION"));

/// Public lookup URL for a check type, if one is built in
pub fn default_template(check_type: CheckType) -> Option<&'static str> {
    match check_type {
        CheckType::Domain => Some("https://rdap.org/domain/{name}"),
        CheckType::Npm => Some("https://registry.npmjs.org/{name}"),
        CheckType::Pypi => Some("https://pypi.org/pypi/{name}/json"),
        CheckType::Cargo => Some("https://crates.io/api/v1/crates/{name}"),
        CheckType::Github => Some("https://api.github.com/users/{name}"),
        _ => None,
    }
}

fn source_name(check_type: CheckType) -> &'static str {
    match check_type {
        CheckType::Domain => "rdap",
        CheckType::Cargo => "crates.io",
        other => other.as_str(),
    }
}

/// Availability checker backed by one HTTP lookup per name
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the bearer token.
pub struct HttpChecker {
    check_type: CheckType,
    /// Lookup URL with a `{name}` placeholder
    url_template: String,
    /// Bearer token (GitHub), ⚠️ NEVER log this value
    token: Option<String>,
    client: reqwest::Client,
    rate_limiter: Option<Arc<RateLimiter>>,
    cache: Option<(ResultCache, CacheTtlConfig)>,
}

// Custom Debug implementation that hides the token
impl std::fmt::Debug for HttpChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChecker")
            .field("check_type", &self.check_type)
            .field("url_template", &self.url_template)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .field("rate_limited", &self.rate_limiter.is_some())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl HttpChecker {
    /// Create a checker for `check_type` against a URL template
    ///
    /// # Errors
    ///
    /// `Error::Config` if the template has no `{name}` placeholder or the
    /// HTTP client cannot be built.
    pub fn new(check_type: CheckType, url_template: impl Into<String>) -> Result<Self> {
        let url_template = url_template.into();
        if !url_template.contains("{name}") {
            return Err(Error::config(format!(
                "URL template for {} has no {{name}} placeholder: {}",
                check_type, url_template
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            check_type,
            url_template,
            token: None,
            client,
            rate_limiter: None,
            cache: None,
        })
    }

    /// Create a checker using the built-in public endpoint for `check_type`
    pub fn public(check_type: CheckType) -> Result<Self> {
        let template = default_template(check_type).ok_or_else(|| {
            Error::config(format!("No built-in HTTP endpoint for {}", check_type))
        })?;
        Self::new(check_type, template)
    }

    /// Send `Authorization: Bearer <token>` with every request
    ///
    /// Empty tokens are ignored.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.is_empty()).then_some(token);
        self
    }

    /// Consult a rate limiter before every request
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Reuse answers from a cache, storing new ones with `ttl` per outcome
    pub fn with_cache(mut self, cache: ResultCache, ttl: CacheTtlConfig) -> Self {
        self.cache = Some((cache, ttl));
        self
    }

    /// Replace the HTTP client (custom timeout, proxy, ...)
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn url_for(&self, name: &str) -> Result<reqwest::Url> {
        let raw = self.url_template.replace("{name}", name);
        reqwest::Url::parse(&raw)
            .map_err(|e| Error::invalid_input(format!("Bad lookup URL {}: {}", raw, e)))
    }

    /// Everything after the first label, so `acme.co.uk` yields `co.uk`
    fn tld_of<'a>(&self, name: &'a str) -> Option<&'a str> {
        match self.check_type {
            CheckType::Domain => name.split_once('.').map(|(_, tld)| tld),
            _ => None,
        }
    }

    fn result(&self, name: &str, available: Availability, endpoint: &str) -> CheckResult {
        let mut result = CheckResult::new(name, self.check_type, available);
        if let Some(tld) = self.tld_of(name) {
            result.tld = Some(tld.to_ascii_lowercase());
        }
        result.provenance.source = source_name(self.check_type).to_string();
        result.provenance.server = endpoint.to_string();
        result
    }

    async fn cached(&self, name: &str) -> Option<CheckResult> {
        let (cache, _) = self.cache.as_ref()?;
        match cache
            .get_cached_result(name, self.check_type, self.tld_of(name))
            .await
        {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(
                    "Cache lookup for {} '{}' failed, checking live: {}",
                    self.check_type,
                    name,
                    e
                );
                None
            }
        }
    }

    async fn store(&self, name: &str, result: &CheckResult) {
        let Some((cache, ttl)) = self.cache.as_ref() else {
            return;
        };
        if let Err(e) = cache
            .set_cached_result(name, result, ttl.ttl_for(result.available))
            .await
        {
            tracing::warn!(
                "Failed to cache {} result for '{}': {}",
                self.check_type,
                name,
                e
            );
        }
    }

    /// Admission check plus request accounting
    ///
    /// Storage failures are logged and the request goes ahead.
    async fn admit(&self, endpoint: &str) -> Admission {
        let Some(limiter) = self.rate_limiter.as_ref() else {
            return Admission::Allowed;
        };

        match limiter.allow(endpoint).await {
            Ok(Admission::Allowed) => {}
            Ok(denied) => return denied,
            Err(e) => tracing::warn!("Rate limit lookup for {} failed: {}", endpoint, e),
        }

        if let Err(e) = limiter.record(endpoint).await {
            tracing::warn!("Failed to record request to {}: {}", endpoint, e);
        }
        Admission::Allowed
    }

    fn backoff_from(response: &reqwest::Response) -> chrono::Duration {
        response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|secs| *secs > 0)
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_429_BACKOFF_SECS))
    }
}

#[async_trait]
impl Checker for HttpChecker {
    async fn check(&self, name: &str) -> Result<CheckResult> {
        if let Some(hit) = self.cached(name).await {
            tracing::debug!("{} '{}' served from cache", self.check_type, name);
            return Ok(hit);
        }

        let url = self.url_for(name)?;
        let endpoint = url.host_str().unwrap_or_default().to_string();

        if let Admission::Denied { retry_after } = self.admit(&endpoint).await {
            tracing::debug!(
                "{} '{}' not checked, {} busy for {}s",
                self.check_type,
                name,
                endpoint,
                retry_after.num_seconds()
            );
            let wait = retry_after.num_seconds();
            return Ok(self
                .result(name, Availability::RateLimited, &endpoint)
                .with_message(format!("rate limited locally, retry after {}s", wait))
                .with_extra(RETRY_AFTER_KEY, serde_json::json!(wait)));
        }

        let mut request = self.client.get(url).header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        tracing::debug!("Checking {} '{}' via {}", self.check_type, name, endpoint);
        let response = request.send().await.map_err(|e| {
            Error::http(format!("{} lookup for '{}' failed: {}", self.check_type, name, e))
        })?;

        let status = response.status();
        let result = match status.as_u16() {
            404 => self
                .result(name, Availability::Available, &endpoint)
                .with_message("not found"),
            429 => {
                let backoff = Self::backoff_from(&response);
                if let Some(limiter) = &self.rate_limiter
                    && let Err(e) = limiter.record_429(&endpoint, backoff).await
                {
                    tracing::warn!("Failed to record backoff for {}: {}", endpoint, e);
                }
                self.result(name, Availability::RateLimited, &endpoint)
                    .with_message(format!("rate limited by {}", endpoint))
                    .with_extra(RETRY_AFTER_KEY, serde_json::json!(backoff.num_seconds()))
            }
            _ if status.is_success() => self
                .result(name, Availability::Taken, &endpoint)
                .with_message("registered"),
            _ => {
                tracing::debug!("{} '{}': unexpected status {}", self.check_type, name, status);
                self.result(name, Availability::Unknown, &endpoint)
                    .with_message(format!("unexpected status {}", status))
            }
        }
        .with_status_code(status.as_u16());

        self.store(name, &result).await;
        Ok(result)
    }

    fn check_type(&self) -> CheckType {
        self.check_type
    }

    fn supports_name(&self, name: &str) -> bool {
        rules::supports(self.check_type, name)
    }
}

/// Shared settings for the built-in checkers
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub cache: Option<ResultCache>,
    pub ttl: CacheTtlConfig,
    /// Token for the GitHub API; raises its anonymous quota
    pub github_token: Option<String>,
}

/// Register a public checker for every type with a built-in endpoint
///
/// # Returns
///
/// The check types that were registered.
pub fn register_defaults(
    registry: &CheckerRegistry,
    options: &HttpOptions,
) -> Result<Vec<CheckType>> {
    let types = [
        CheckType::Domain,
        CheckType::Npm,
        CheckType::Pypi,
        CheckType::Cargo,
        CheckType::Github,
    ];

    for check_type in types {
        let mut checker = HttpChecker::public(check_type)?;
        if let Some(limiter) = &options.rate_limiter {
            checker = checker.with_rate_limiter(limiter.clone());
        }
        if let Some(cache) = &options.cache {
            checker = checker.with_cache(cache.clone(), options.ttl.clone());
        }
        if check_type == CheckType::Github
            && let Some(token) = &options.github_token
        {
            checker = checker.with_token(token.clone());
        }

        tracing::debug!("Registering HTTP checker for {}", check_type);
        registry.register(Arc::new(checker));
    }

    Ok(types.to_vec())
}
