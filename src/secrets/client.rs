//! The Vault KV v2 client used by the command line front end.

use serde_json::json;
use tracing::{debug, info, instrument};

use super::capabilities::{self, AccessGrant};
use super::discovery::{filter_readable, DiscoveryReport, DiscoveryResult, PathDiscoverer};
use super::envelope::{decode_document, EnvelopeKind};
use super::error::Result;
use super::path;
use super::transport::{Transport, VaultMethod};
use super::types::SecretDocument;
use crate::config::{DiscoveryConfig, EndpointConfig};

/// Client for one Vault endpoint.
///
/// Holds no state between calls beyond its configuration and the shared
/// connection pool.
///
/// # Example
///
/// ```rust,ignore
/// use vault_env::config::EndpointConfig;
/// use vault_env::secrets::VaultClient;
///
/// let client = VaultClient::new(EndpointConfig::new("https://vault.local:8200", "hvs.token"))?;
/// let doc = client.read_secret("kv/data/app/db").await?;
/// ```
#[derive(Debug, Clone)]
pub struct VaultClient {
    transport: Transport,
    discoverer: PathDiscoverer,
}

impl VaultClient {
    pub fn new(endpoint: EndpointConfig) -> Result<Self> {
        Self::with_discovery(endpoint, DiscoveryConfig::default())
    }

    pub fn with_discovery(endpoint: EndpointConfig, discovery: DiscoveryConfig) -> Result<Self> {
        let transport = Transport::new(endpoint)?;
        let discoverer = PathDiscoverer::new(transport.clone(), discovery);
        Ok(Self { transport, discoverer })
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        self.transport.endpoint()
    }

    /// Fetch the document stored at `path` (e.g. `kv/data/app/db`).
    #[instrument(skip_all, fields(path = %path))]
    pub async fn read_secret(&self, path: &str) -> Result<SecretDocument> {
        path::validate(path)?;

        let body = self.transport.send(VaultMethod::Get, path, &[], None).await?;
        let (document, kind) = decode_document(path, body)?;

        if kind == EnvelopeKind::SoftDeleted {
            info!("latest version is deleted, returning empty document");
        }
        debug!(keys = document.len(), envelope = ?kind, "read secret");
        Ok(document)
    }

    /// Replace the document at `path`. Keys not in `document` are dropped.
    #[instrument(skip_all, fields(path = %path, keys = document.len()))]
    pub async fn write_secret(&self, path: &str, document: &SecretDocument) -> Result<()> {
        path::validate(path)?;

        let target = path.trim_end_matches('/');
        let body = json!({ "data": document });
        self.transport.send(VaultMethod::Post, target, &[], Some(&body)).await?;

        info!("secret written");
        Ok(())
    }

    /// Overlay `patch` on the current document and write the result back.
    ///
    /// A `null` value in `patch` removes that key. Not atomic: a concurrent
    /// writer between the read and the write is overwritten.
    #[instrument(skip_all, fields(path = %path, keys = patch.len()))]
    pub async fn merge_secret(&self, path: &str, patch: &SecretDocument) -> Result<SecretDocument> {
        let mut document = self.read_secret(path).await?;
        for (key, value) in patch {
            if value.is_null() {
                document.remove(key);
            } else {
                document.insert(key.clone(), value.clone());
            }
        }

        self.write_secret(path, &document).await?;
        Ok(document)
    }

    /// Permanently delete the secret at `path`, all versions included.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn delete_secret(&self, path: &str) -> Result<()> {
        path::validate(path)?;

        let target = path::to_metadata_path(path);
        debug!(target = %target, "deleting secret metadata");
        self.transport.send(VaultMethod::Delete, &target, &[], None).await?;

        info!("secret deleted");
        Ok(())
    }

    /// Every leaf path below `root`, readable or not.
    pub async fn discover(&self, root: &str) -> Result<DiscoveryReport> {
        self.discoverer.discover(root).await
    }

    /// Capabilities of the current token on each of `paths`.
    pub async fn check_access<I, S>(&self, paths: I) -> Result<AccessGrant>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        capabilities::check_access(&self.transport, paths).await
    }

    /// Discover below `root` and keep the paths the token can read.
    ///
    /// Descent follows LIST permission; `read` is checked on the leaves
    /// afterwards.
    #[instrument(skip_all, fields(root = %root))]
    pub async fn discover_readable(&self, root: &str) -> Result<DiscoveryResult> {
        let report = self.discover(root).await?;
        let grant = self.check_access(report.leaves.iter()).await?;
        let result = filter_readable(report, &grant);

        info!(
            readable = result.paths.len(),
            dropped = result.warnings.len(),
            "readable secrets resolved"
        );
        Ok(result)
    }
}
