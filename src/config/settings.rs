//! # Configuration Settings
//!
//! Endpoint and discovery settings consumed by the Vault client. Values are
//! passed in explicitly; nothing in the client reads global state.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use super::tls::{parse_flag, TlsPolicy};
use crate::errors::{Error, Result};
use crate::secrets::SecretString;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Address used when nothing else names one.
pub const DEFAULT_VAULT_ADDR: &str = "http://127.0.0.1:8200";

/// Connection settings for one Vault endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EndpointConfig {
    /// Vault server address (e.g. "https://vault.example.com:8200")
    #[validate(url(message = "Vault address must be a valid URL"))]
    pub base_url: String,

    /// Token sent as `X-Vault-Token`
    pub token: SecretString,

    /// Certificate verification policy for this endpoint only
    #[serde(default)]
    pub tls: TlsPolicy,

    /// Vault Enterprise namespace
    #[serde(default)]
    pub namespace: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    #[validate(range(min = 1, max = 600, message = "Timeout must be between 1 and 600 seconds"))]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<SecretString>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            tls: TlsPolicy::default(),
            namespace: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    pub fn with_tls(mut self, tls: TlsPolicy) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Load the endpoint from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Load the endpoint from `env`, see [`EnvEndpoint`] for the variables.
    ///
    /// The address defaults to [`DEFAULT_VAULT_ADDR`]; a missing token is an
    /// error.
    pub fn from_env_with<F>(env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let found = EnvEndpoint::from_lookup(env)?;
        let token = found
            .token
            .ok_or_else(|| Error::config("VAULT_TOKEN environment variable not set"))?;

        let mut config = Self::new(found.addr.unwrap_or_else(|| DEFAULT_VAULT_ADDR.to_string()), token)
            .with_timeout(found.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS));
        if found.skip_verify {
            config = config.with_tls(TlsPolicy::insecure());
        }
        if let Some(namespace) = found.namespace {
            config = config.with_namespace(namespace);
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges and the presence of a token.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;

        if self.token.is_empty() {
            return Err(Error::validation("token: Vault token cannot be empty"));
        }

        Ok(())
    }
}

/// Bounds for one recursive tree walk.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Deepest directory level descended below the root
    #[validate(range(min = 1, max = 256, message = "Max depth must be between 1 and 256"))]
    pub max_depth: usize,

    /// LIST requests allowed in flight at once
    #[validate(range(min = 1, max = 64, message = "Concurrency must be between 1 and 64"))]
    pub concurrency: usize,

    /// Wall-clock budget for the whole walk in seconds
    #[validate(range(min = 1, max = 3600, message = "Deadline must be between 1 and 3600 seconds"))]
    pub deadline_seconds: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { max_depth: 32, concurrency: 8, deadline_seconds: 120 }
    }
}

impl DiscoveryConfig {
    /// Load overrides from `VAULT_ENV_DISCOVERY_MAX_DEPTH`,
    /// `VAULT_ENV_DISCOVERY_CONCURRENCY` and `VAULT_ENV_DISCOVERY_DEADLINE`.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    pub fn from_env_with<F>(env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = env("VAULT_ENV_DISCOVERY_MAX_DEPTH") {
            config.max_depth = raw
                .trim()
                .parse()
                .map_err(|e| Error::config(format!("Invalid discovery max depth: {}", e)))?;
        }
        if let Some(raw) = env("VAULT_ENV_DISCOVERY_CONCURRENCY") {
            config.concurrency = raw
                .trim()
                .parse()
                .map_err(|e| Error::config(format!("Invalid discovery concurrency: {}", e)))?;
        }
        if let Some(raw) = env("VAULT_ENV_DISCOVERY_DEADLINE") {
            config.deadline_seconds = parse_seconds(&raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_seconds)
    }
}

/// Endpoint values found in the environment.
///
/// Each value is read from `VAULT_ENV_*` first, then the standard `VAULT_*`
/// name; blank values count as unset.
///
/// | field | variables |
/// |---|---|
/// | `addr` | `VAULT_ENV_ADDR`, `VAULT_ADDR` |
/// | `token` | `VAULT_ENV_TOKEN`, `VAULT_TOKEN` |
/// | `namespace` | `VAULT_ENV_NAMESPACE`, `VAULT_NAMESPACE` |
/// | `skip_verify` | `VAULT_ENV_SKIP_VERIFY`, `VAULT_SKIP_VERIFY` |
/// | `timeout_seconds` | `VAULT_ENV_TIMEOUT`, `VAULT_CLIENT_TIMEOUT` (`30` or `30s`) |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvEndpoint {
    pub addr: Option<String>,
    pub token: Option<String>,
    pub namespace: Option<String>,
    pub skip_verify: bool,
    pub timeout_seconds: Option<u64>,
}

impl EnvEndpoint {
    pub fn from_lookup<F>(env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| env(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());
        let var = |primary: &str, fallback: &str| read(primary).or_else(|| read(fallback));

        let timeout_seconds = var("VAULT_ENV_TIMEOUT", "VAULT_CLIENT_TIMEOUT")
            .map(|raw| parse_seconds(&raw))
            .transpose()?;

        Ok(Self {
            addr: var("VAULT_ENV_ADDR", "VAULT_ADDR"),
            token: var("VAULT_ENV_TOKEN", "VAULT_TOKEN"),
            namespace: var("VAULT_ENV_NAMESPACE", "VAULT_NAMESPACE"),
            skip_verify: var("VAULT_ENV_SKIP_VERIFY", "VAULT_SKIP_VERIFY").is_some_and(|v| parse_flag(&v)),
            timeout_seconds,
        })
    }
}

/// Parse `30` or `30s` into seconds.
pub fn parse_seconds(raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    trimmed
        .strip_suffix('s')
        .unwrap_or(trimmed)
        .parse()
        .map_err(|e| Error::config(format!("Invalid duration '{}': {}", raw, e)))
}
