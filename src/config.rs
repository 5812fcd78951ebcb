//! Gateway configuration loaded from environment variables.
//!
//! Every setting has a default, so an empty environment yields a runnable
//! local gateway. `from_lookup` takes the variable source as a closure so the
//! parsing rules can be exercised without touching the process environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

// ─── Defaults ────────────────────────────────────────────────────────────────

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_DEMO_BASE: &str = "http://localhost:8000";
pub const DEFAULT_APCBO_BASE: &str = "https://apcbo.aptechdevlab.com";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CLIENT_MAX_ATTEMPTS: u32 = 10;
const DEFAULT_CLIENT_BACKOFF_MS: u64 = 1_000;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Configuration loading or validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

// ─── Public Types ────────────────────────────────────────────────────────────

/// Where the newsroom tools read business units and users from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewsroomSource {
    /// The immutable in-memory data set built at startup.
    #[default]
    Local,
    /// The newsroom REST API at `DEMO_BASE`, via the upstream client.
    Remote,
}

impl FromStr for NewsroomSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(NewsroomSource::Local),
            "remote" => Ok(NewsroomSource::Remote),
            other => Err(format!("expected 'local' or 'remote', got '{other}'")),
        }
    }
}

/// Full gateway configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// `GATEWAY_ADDR`
    pub bind_addr: SocketAddr,
    /// `DEMO_BASE`
    pub demo_base: String,
    /// `APCBO_BASE`
    pub apcbo_base: String,
    /// `APCBO_TOKEN` is sent as a bearer token to the user lookup when set.
    pub apcbo_token: Option<String>,
    /// `NEWSROOM_SOURCE`
    pub newsroom_source: NewsroomSource,
    /// `UPSTREAM_TIMEOUT_SECS`
    pub upstream_timeout: Duration,
    /// `CLIENT_MAX_ATTEMPTS`: invocation client attempt ceiling.
    pub client_max_attempts: u32,
    /// `CLIENT_BACKOFF_MS`: invocation client fixed backoff.
    pub client_backoff: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            demo_base: DEFAULT_DEMO_BASE.to_string(),
            apcbo_base: DEFAULT_APCBO_BASE.to_string(),
            apcbo_token: None,
            newsroom_source: NewsroomSource::Local,
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            client_max_attempts: DEFAULT_CLIENT_MAX_ATTEMPTS,
            client_backoff: Duration::from_millis(DEFAULT_CLIENT_BACKOFF_MS),
        }
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

impl GatewayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_or(
            "GATEWAY_ADDR",
            get("GATEWAY_ADDR"),
            DEFAULT_BIND_ADDR.to_string(),
        )?;
        let demo_base = trim_base(get("DEMO_BASE").unwrap_or_else(|| DEFAULT_DEMO_BASE.into()));
        let apcbo_base =
            trim_base(get("APCBO_BASE").unwrap_or_else(|| DEFAULT_APCBO_BASE.into()));
        let apcbo_token = get("APCBO_TOKEN");
        let newsroom_source: NewsroomSource =
            parse_or("NEWSROOM_SOURCE", get("NEWSROOM_SOURCE"), "local".to_string())?;

        let timeout_secs: u64 = parse_or(
            "UPSTREAM_TIMEOUT_SECS",
            get("UPSTREAM_TIMEOUT_SECS"),
            DEFAULT_UPSTREAM_TIMEOUT_SECS.to_string(),
        )?;
        if timeout_secs == 0 {
            return Err(invalid("UPSTREAM_TIMEOUT_SECS", "must be at least 1"));
        }

        let client_max_attempts: u32 = parse_or(
            "CLIENT_MAX_ATTEMPTS",
            get("CLIENT_MAX_ATTEMPTS"),
            DEFAULT_CLIENT_MAX_ATTEMPTS.to_string(),
        )?;
        if client_max_attempts == 0 {
            return Err(invalid("CLIENT_MAX_ATTEMPTS", "must be at least 1"));
        }

        let backoff_ms: u64 = parse_or(
            "CLIENT_BACKOFF_MS",
            get("CLIENT_BACKOFF_MS"),
            DEFAULT_CLIENT_BACKOFF_MS.to_string(),
        )?;

        Ok(Self {
            bind_addr,
            demo_base,
            apcbo_base,
            apcbo_token,
            newsroom_source,
            upstream_timeout: Duration::from_secs(timeout_secs),
            client_max_attempts,
            client_backoff: Duration::from_millis(backoff_ms),
        })
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = value.unwrap_or(default);
    raw.trim()
        .parse::<T>()
        .map_err(|e| invalid(key, &format!("'{raw}': {e}")))
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn trim_base(base: String) -> String {
    base.trim().trim_end_matches('/').to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
