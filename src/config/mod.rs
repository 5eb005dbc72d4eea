//! # Configuration Management
//!
//! Explicit configuration values for the Vault client: the endpoint (address,
//! token, TLS policy) and the bounds of a discovery walk.

pub mod settings;
pub mod tls;

pub use settings::{DiscoveryConfig, EndpointConfig, EnvEndpoint, DEFAULT_TIMEOUT_SECONDS, DEFAULT_VAULT_ADDR};
pub use tls::TlsPolicy;
