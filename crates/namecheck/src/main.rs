// # namecheck - name availability checks
//
// CRITICAL RULES:
// - This is a THIN integration layer ONLY
// - DO NOT add orchestration, rate limiting or caching logic here
// - All checking logic MUST be in namecheck-core (and checker crates)
// - Configuration is via environment variables ONLY
//
// The binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Wiring store, rate limiter, cache and checkers
// 4. Running the batch and printing JSON to stdout
// 5. Cancelling in-flight checks on SIGTERM/SIGINT
//
// ## Usage
//
// ```text
// namecheck <name>...                   check names, print BatchResult JSON
// namecheck rate-limits [prefix]        list stored rate-limit rows
// namecheck reset-rate-limits [prefix]  delete rate-limit rows
// namecheck purge-cache                 delete expired cache rows
// ```
//
// ## Configuration
//
// ### Profile
// - `NAMECHECK_PROFILE`: Built-in profile (default, dev, startup, minimal)
// - `NAMECHECK_TLDS`, `NAMECHECK_REGISTRIES`, `NAMECHECK_HANDLES`:
//   Comma-separated lists replacing the profile's own
//
// ### Execution
// - `NAMECHECK_CONCURRENCY`: Names checked at once (default 4)
// - `NAMECHECK_INCLUDE_UNSUPPORTED`: Report unsupported targets, abort on checker errors
//
// ### Store
// - `NAMECHECK_STORE_TYPE`: file or memory (default memory)
// - `NAMECHECK_STORE_PATH`: Path to state file (for file store)
//
// ### Rate limiting
// - `NAMECHECK_RATE_WINDOW_SECS`: Counting window (default 60)
// - `NAMECHECK_RATE_LIMITS`: `endpoint=limit,...`
// - `NAMECHECK_SAFETY_MARGIN`: Fraction of each limit used (default 0.9)
//
// ### Other
// - `NAMECHECK_GITHUB_TOKEN`: Token for the GitHub API
// - `NAMECHECK_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export NAMECHECK_PROFILE=startup
// export NAMECHECK_STORE_TYPE=file
// export NAMECHECK_STORE_PATH=$HOME/.cache/namecheck/state.json
// export NAMECHECK_RATE_LIMITS=api.github.com=60,registry.npmjs.org=100
//
// namecheck acme zentro
// ```

use anyhow::{Context, Result};
use namecheck_core::types::Profile;
use namecheck_core::{
    CheckerRegistry, NamecheckConfig, Orchestrator, ResultCache, StoreConfig, open_store,
    run_batch_checks,
};
use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Every name checked
/// - 1: Configuration or usage error
/// - 2: Runtime error (checker abort, storage failure, cancellation)
#[derive(Debug, Clone, Copy)]
enum NamecheckExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<NamecheckExitCode> for ExitCode {
    fn from(code: NamecheckExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// What to do, from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Check(Vec<String>),
    RateLimits(String),
    ResetRateLimits(String),
    PurgeCache,
}

impl Command {
    fn from_args(args: &[String]) -> Result<Self> {
        let prefix = || args.get(1).cloned().unwrap_or_default();
        match args.first().map(String::as_str) {
            None => anyhow::bail!(
                "Usage: namecheck <name>... | rate-limits [prefix] | \
                reset-rate-limits [prefix] | purge-cache"
            ),
            Some("rate-limits") => Ok(Command::RateLimits(prefix())),
            Some("reset-rate-limits") => Ok(Command::ResetRateLimits(prefix())),
            Some("purge-cache") => Ok(Command::PurgeCache),
            Some(_) => Ok(Command::Check(args.to_vec())),
        }
    }
}

/// Application configuration
struct Config {
    core: NamecheckConfig,
    #[cfg(feature = "http")]
    github_token: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mut core = NamecheckConfig::new();

        let profile_name = env::var("NAMECHECK_PROFILE").unwrap_or_else(|_| "default".to_string());
        core.profile = Profile::preset(&profile_name).with_context(|| {
            format!(
                "NAMECHECK_PROFILE '{}' is not a built-in profile. \
                Built-in profiles: default, dev, startup, minimal",
                profile_name
            )
        })?;
        if let Some(tlds) = env_list("NAMECHECK_TLDS") {
            core.profile.tlds = tlds;
        }
        if let Some(registries) = env_list("NAMECHECK_REGISTRIES") {
            core.profile.registries = registries;
        }
        if let Some(handles) = env_list("NAMECHECK_HANDLES") {
            core.profile.handles = handles;
        }

        if let Some(concurrency) = env_parse("NAMECHECK_CONCURRENCY")? {
            core.batch.concurrency = concurrency;
        }
        if let Some(include) = env_parse("NAMECHECK_INCLUDE_UNSUPPORTED")? {
            core.orchestrator.include_unsupported = include;
        }

        core.store = match env::var("NAMECHECK_STORE_TYPE")
            .unwrap_or_else(|_| "memory".to_string())
            .as_str()
        {
            "memory" => StoreConfig::Memory,
            "file" => StoreConfig::File {
                path: env::var("NAMECHECK_STORE_PATH").context(
                    "NAMECHECK_STORE_PATH is required when NAMECHECK_STORE_TYPE=file",
                )?,
            },
            other => anyhow::bail!(
                "NAMECHECK_STORE_TYPE '{}' is not supported. Supported types: file, memory",
                other
            ),
        };

        if let Some(window) = env_parse("NAMECHECK_RATE_WINDOW_SECS")? {
            core.rate_limit.window_secs = window;
        }
        if let Ok(raw) = env::var("NAMECHECK_RATE_LIMITS") {
            core.rate_limit.overrides = parse_rate_limits(&raw)?;
        }
        if let Some(margin) = env_parse("NAMECHECK_SAFETY_MARGIN")? {
            core.rate_limit.safety_margin = margin;
        }

        Ok(Self {
            core,
            #[cfg(feature = "http")]
            github_token: env::var("NAMECHECK_GITHUB_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            log_level: env::var("NAMECHECK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.core.validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "NAMECHECK_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

/// Comma-separated list; unset means "keep the profile's own"
fn env_list(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        Err(_) => Ok(None),
    }
}

/// Parse `endpoint=limit,endpoint=limit`
fn parse_rate_limits(raw: &str) -> Result<HashMap<String, u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (endpoint, limit) = pair.split_once('=').with_context(|| {
                format!("NAMECHECK_RATE_LIMITS entry '{}' is not endpoint=limit", pair)
            })?;
            let limit = limit.trim().parse::<u32>().with_context(|| {
                format!("NAMECHECK_RATE_LIMITS entry '{}' has an invalid limit", pair)
            })?;
            Ok((endpoint.trim().to_string(), limit))
        })
        .collect()
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = match Command::from_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            return NamecheckExitCode::ConfigError.into();
        }
    };

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return NamecheckExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return NamecheckExitCode::ConfigError.into();
    }

    // Initialize tracing; stdout is reserved for JSON
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return NamecheckExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return NamecheckExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run(config, command).await {
            Ok(()) => NamecheckExitCode::Success,
            Err(e) => {
                error!("{:#}", e);
                let is_config = e
                    .downcast_ref::<namecheck_core::Error>()
                    .is_some_and(namecheck_core::Error::is_config);
                if is_config {
                    NamecheckExitCode::ConfigError
                } else {
                    NamecheckExitCode::RuntimeError
                }
            }
        }
    });

    result.into()
}

/// Wire components and execute one command
async fn run(config: Config, command: Command) -> Result<()> {
    let store = open_store(&config.core.store).await?;
    info!("Using {} store", config.core.store.type_name());

    match command {
        Command::RateLimits(prefix) => {
            let admin = namecheck_core::RateLimitAdmin::new(store);
            let rows = admin.list(&prefix).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(())
        }
        Command::ResetRateLimits(prefix) => {
            let admin = namecheck_core::RateLimitAdmin::new(store.clone());
            let removed = admin.reset_prefix(&prefix).await?;
            store.flush().await?;
            println!("{}", serde_json::json!({ "removed": removed }));
            Ok(())
        }
        Command::PurgeCache => {
            let removed = ResultCache::new(store.clone()).purge_expired().await?;
            store.flush().await?;
            println!("{}", serde_json::json!({ "removed": removed }));
            Ok(())
        }
        Command::Check(names) => {
            let registry = Arc::new(CheckerRegistry::new());

            #[cfg(feature = "http")]
            {
                let limiter = namecheck_core::RateLimiter::from_config(
                    store.clone(),
                    &config.core.rate_limit,
                )?;
                let options = namecheck_http::HttpOptions {
                    rate_limiter: Some(Arc::new(limiter)),
                    cache: Some(ResultCache::new(store.clone())),
                    ttl: config.core.cache.clone(),
                    github_token: config.github_token.clone(),
                };
                let types = namecheck_http::register_defaults(&registry, &options)?;
                info!("Registered HTTP checkers: {:?}", types);
            }

            #[cfg(not(feature = "http"))]
            {
                warn!("Built without checker crates; every target will be skipped");
            }

            let orchestrator = Arc::new(Orchestrator::from_config(
                registry,
                &config.core.orchestrator,
            ));

            let token = CancellationToken::new();
            let signal_token = token.clone();
            tokio::spawn(async move {
                match wait_for_signal().await {
                    Ok(signal) => {
                        warn!("Received {}, cancelling checks", signal);
                        signal_token.cancel();
                    }
                    Err(e) => warn!("Signal handling unavailable: {}", e),
                }
            });

            info!(
                "Checking {} name(s) with profile '{}' (strict: {})",
                names.len(),
                config.core.profile.name,
                orchestrator.include_unsupported()
            );
            let outcome = run_batch_checks(
                &token,
                orchestrator,
                &config.core.profile,
                names.as_slice(),
                config.core.batch.concurrency,
            )
            .await;

            if let Err(e) = store.flush().await {
                warn!("Failed to flush store: {}", e);
            }

            let results = outcome?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
