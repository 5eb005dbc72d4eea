//! # vault-env
//!
//! Client and command line tool for HashiCorp Vault KV v2 secrets. It finds
//! the secrets a token can read, shows and edits them, and loads them into
//! the environment of other processes.
//!
//! ## Architecture
//!
//! ```text
//! CLI (clap) → VaultClient → PathDiscoverer / capabilities → Transport (reqwest) → Vault
//!                  ↓
//!           EndpointConfig / DiscoveryConfig
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vault_env::config::EndpointConfig;
//! use vault_env::secrets::VaultClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = VaultClient::new(EndpointConfig::from_env()?)?;
//!     let listing = client.discover_readable("kv").await?;
//!     for secret in listing.paths {
//!         println!("{}", secret.path);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod secrets;

// Re-export commonly used types
pub use config::{DiscoveryConfig, EndpointConfig, TlsPolicy};
pub use errors::{Error, Result};
pub use secrets::{SecretsError, VaultClient};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "vault-env");
    }
}
