//! Configuration file handling for the vault-env CLI
//!
//! Manages the server profiles stored in ~/.vault-env/config.toml and resolves
//! the endpoint for a command from flags, the selected profile and the
//! environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{EndpointConfig, EnvEndpoint, TlsPolicy, DEFAULT_TIMEOUT_SECONDS};
use crate::secrets::SecretString;

pub use crate::config::DEFAULT_VAULT_ADDR;

/// Mount listed when a profile does not name one
pub const DEFAULT_MOUNT: &str = "secret";

/// A named Vault server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerProfile {
    pub name: String,

    /// Vault server address
    pub url: String,

    /// KV v2 mount listed by default
    #[serde(default = "default_mount")]
    pub mount: String,

    /// Skip certificate verification for this server only
    #[serde(default)]
    pub ignore_ssl: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

fn default_mount() -> String {
    DEFAULT_MOUNT.to_string()
}

impl ServerProfile {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            mount: default_mount(),
            ignore_ssl: false,
            token: None,
            namespace: None,
        }
    }
}

/// CLI configuration stored in ~/.vault-env/config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CliConfig {
    /// Profile used when `--server` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerProfile>,
}

impl CliConfig {
    /// Get the configuration file path
    ///
    /// `VAULT_ENV_CONFIG` overrides the default ~/.vault-env/config.toml.
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("VAULT_ENV_CONFIG") {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Unable to determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".vault-env");
        path.push("config.toml");

        Ok(path)
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn find(&self, name: &str) -> Option<&ServerProfile> {
        self.servers.iter().find(|server| server.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut ServerProfile> {
        self.servers.iter_mut().find(|server| server.name == name)
    }

    /// Insert `profile`, replacing any profile with the same name.
    ///
    /// Returns true when an existing profile was replaced.
    pub fn upsert(&mut self, profile: ServerProfile) -> bool {
        match self.find_mut(&profile.name) {
            Some(existing) => {
                *existing = profile;
                true
            }
            None => {
                self.servers.push(profile);
                false
            }
        }
    }

    /// Remove the named profile, clearing the selection if it pointed there.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.servers.len();
        self.servers.retain(|server| server.name != name);
        if self.selected.as_deref() == Some(name) {
            self.selected = None;
        }
        self.servers.len() != before
    }

    /// The profile named by `--server`, else the selected one.
    pub fn active_profile(&self, server_flag: Option<&str>) -> Result<Option<&ServerProfile>> {
        if let Some(name) = server_flag {
            let profile = self.find(name).with_context(|| {
                format!("Unknown server '{}'. Run 'vault-env server list' to see configured servers", name)
            })?;
            return Ok(Some(profile));
        }

        Ok(self.selected.as_deref().and_then(|name| self.find(name)))
    }
}

/// Endpoint values given on the command line
#[derive(Debug, Clone, Default)]
pub struct EndpointOverrides {
    pub server: Option<String>,
    pub url: Option<String>,
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
    pub insecure: bool,
    pub timeout: Option<u64>,
}

/// An endpoint ready to use plus the mount listed by default
#[derive(Debug, Clone)]
pub struct ResolvedEndpoint {
    pub endpoint: EndpointConfig,
    pub mount: String,
    pub profile: Option<String>,
}

/// Resolve the endpoint for one command from the process environment.
pub fn resolve_endpoint(overrides: &EndpointOverrides, config: &CliConfig) -> Result<ResolvedEndpoint> {
    resolve_endpoint_with(overrides, config, |key| std::env::var(key).ok())
}

/// Resolve the endpoint for one command
///
/// Checks sources in the following priority order:
/// 1. command line flags
/// 2. the `--server` profile, or the selected profile
/// 3. `VAULT_ENV_*` then `VAULT_*` environment variables
/// 4. defaults
pub fn resolve_endpoint_with<F>(
    overrides: &EndpointOverrides,
    config: &CliConfig,
    env: F,
) -> Result<ResolvedEndpoint>
where
    F: Fn(&str) -> Option<String>,
{
    let profile = config.active_profile(overrides.server.as_deref())?;
    let env = EnvEndpoint::from_lookup(env)?;

    let url = resolve_url(overrides.url.clone(), profile, env.addr);
    let token = resolve_token(overrides.token.clone(), overrides.token_file.as_deref(), profile, env.token)?;

    let tls = if overrides.insecure || profile.is_some_and(|p| p.ignore_ssl) || env.skip_verify {
        TlsPolicy::insecure()
    } else {
        TlsPolicy::default()
    };

    let timeout = overrides.timeout.or(env.timeout_seconds).unwrap_or(DEFAULT_TIMEOUT_SECONDS);
    let namespace = profile.and_then(|p| p.namespace.clone()).or(env.namespace);

    let mut endpoint = EndpointConfig::new(url, SecretString::new(token))
        .with_tls(tls)
        .with_timeout(timeout);
    if let Some(namespace) = namespace {
        endpoint = endpoint.with_namespace(namespace);
    }
    endpoint.validate()?;

    Ok(ResolvedEndpoint {
        endpoint,
        mount: profile.map(|p| p.mount.clone()).unwrap_or_else(default_mount),
        profile: profile.map(|p| p.name.clone()),
    })
}

fn resolve_url(flag: Option<String>, profile: Option<&ServerProfile>, env: Option<String>) -> String {
    if let Some(url) = flag {
        debug!("Using Vault address from --url flag: {}", url);
        return url;
    }

    if let Some(profile) = profile {
        debug!(server = %profile.name, "Using Vault address from profile: {}", profile.url);
        return profile.url.clone();
    }

    if let Some(url) = env {
        debug!("Using Vault address from environment: {}", url);
        return url;
    }

    debug!("Using default Vault address: {}", DEFAULT_VAULT_ADDR);
    DEFAULT_VAULT_ADDR.to_string()
}

fn resolve_token(
    flag: Option<String>,
    token_file: Option<&Path>,
    profile: Option<&ServerProfile>,
    env: Option<String>,
) -> Result<String> {
    if let Some(token) = flag {
        debug!("Using token from --token flag");
        return Ok(token);
    }

    if let Some(token_file) = token_file {
        debug!("Reading token from file: {}", token_file.display());
        let token = std::fs::read_to_string(token_file)
            .with_context(|| format!("Failed to read token file: {}", token_file.display()))?
            .trim()
            .to_string();

        if token.is_empty() {
            anyhow::bail!("Token file is empty: {}", token_file.display());
        }

        return Ok(token);
    }

    if let Some(token) = profile.and_then(|p| p.token.clone()).filter(|t| !t.is_empty()) {
        debug!("Using token from server profile");
        return Ok(token);
    }

    if let Some(token) = env {
        debug!("Using token from environment");
        return Ok(token);
    }

    anyhow::bail!(
        "No Vault token found. Please provide a token via:\n\
         - --token flag\n\
         - --token-file flag\n\
         - vault-env server set <name> token <token>\n\
         - VAULT_TOKEN environment variable"
    )
}
