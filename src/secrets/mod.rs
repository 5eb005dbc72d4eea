//! Vault KV v2 secrets access.
//!
//! The store keeps versioned key/value documents under paths of the form
//! `{mount}/data/{subpath}`. This module reads, writes and deletes those
//! documents, walks the listing tree to discover them, and asks the store
//! which of them the current token may read.
//!
//! # Layout
//!
//! - [`transport`]: authenticated HTTP requests against one endpoint
//! - [`client`]: the [`VaultClient`] facade
//! - [`discovery`]: bounded concurrent walk of the listing tree
//! - [`capabilities`]: `sys/capabilities-self` resolution
//! - [`envelope`]: decoding of read and list response envelopes
//! - [`path`]: path validation and rewriting
//!
//! # Example
//!
//! ```rust,ignore
//! use vault_env::config::EndpointConfig;
//! use vault_env::secrets::VaultClient;
//!
//! let client = VaultClient::new(EndpointConfig::from_env()?)?;
//!
//! let listing = client.discover_readable("kv/app").await?;
//! for secret in &listing.paths {
//!     println!("{} [{}]", secret.path, secret.access.tags());
//! }
//! for warning in &listing.warnings {
//!     eprintln!("{}", warning.message);
//! }
//! ```
//!
//! Token values never reach logs: they are held in [`SecretString`], whose
//! `Debug` and `Serialize` output is redacted.

pub mod capabilities;
pub mod client;
pub mod discovery;
pub mod envelope;
pub mod error;
pub mod path;
pub mod transport;
pub mod types;

pub use capabilities::{AccessGrant, Capability, CapabilitySet};
pub use client::VaultClient;
pub use discovery::{
    AccessWarning, BranchFailure, DiscoveredPath, DiscoveryReport, DiscoveryResult, PathDiscoverer,
};
pub use error::{Result, SecretsError};
pub use transport::{Transport, VaultMethod};
pub use types::{SecretDocument, SecretString};
