//! HTTP transport for the Vault API.
//!
//! Every request carries the `X-Vault-Token` header, and `X-Vault-Namespace`
//! when a namespace is configured. Non-success statuses and network failures
//! are folded into [`SecretsError`]; nothing is retried.

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn, Instrument};
use url::Url;

use super::error::{Result, SecretsError};
use crate::config::EndpointConfig;

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";
const API_PREFIX: &str = "v1";

/// Request verbs understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultMethod {
    Get,
    List,
    Post,
    Delete,
}

impl VaultMethod {
    fn as_reqwest(self) -> Method {
        match self {
            VaultMethod::Get => Method::GET,
            VaultMethod::Post => Method::POST,
            VaultMethod::Delete => Method::DELETE,
            // Extension method; the literal is a valid token so this cannot fail.
            VaultMethod::List => Method::from_bytes(b"LIST").unwrap_or(Method::GET),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VaultMethod::Get => "GET",
            VaultMethod::List => "LIST",
            VaultMethod::Post => "POST",
            VaultMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for VaultMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated, TLS-policy aware HTTP transport bound to one endpoint.
///
/// Cloning is cheap; clones share the connection pool and endpoint config.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    endpoint: Arc<EndpointConfig>,
    base_url: Url,
}

impl Transport {
    /// Build a transport for `endpoint`.
    ///
    /// Certificate and hostname verification are only disabled when the
    /// endpoint's TLS policy opts out of verification.
    pub fn new(endpoint: EndpointConfig) -> Result<Self> {
        let base_url = Url::parse(endpoint.base_url.trim_end_matches('/')).map_err(|e| {
            SecretsError::config_error(format!("Invalid Vault URL '{}': {}", endpoint.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SecretsError::config_error(format!(
                "Vault URL '{}' cannot carry a path",
                endpoint.base_url
            )));
        }

        let mut builder = Client::builder()
            .user_agent(user_agent())
            .timeout(Duration::from_secs(endpoint.timeout_seconds));

        if !endpoint.tls.verify {
            warn!(
                address = %endpoint.base_url,
                "TLS verification disabled for this endpoint; certificates will not be checked"
            );
            builder = builder.danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true);
        }

        let client = builder.build().map_err(|e| {
            SecretsError::config_error(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self { client, endpoint: Arc::new(endpoint), base_url })
    }

    /// The endpoint this transport talks to.
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Resolve an API path such as `kv/metadata/app/` to a full URL.
    ///
    /// Each segment is percent-encoded; a trailing slash is preserved.
    pub fn url_for(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                SecretsError::config_error(format!("Vault URL '{}' cannot carry a path", self.base_url))
            })?;
            segments.pop_if_empty().push(API_PREFIX);
            segments.extend(path.trim_start_matches('/').split('/'));
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }

    /// Execute one request and return the decoded JSON body, if any.
    ///
    /// An empty success body (e.g. `204 No Content`) yields `Ok(None)`.
    pub async fn send(
        &self,
        method: VaultMethod,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let url = self.url_for(path, query)?;
        let span = crate::vault_span!(method, path);

        async move {
            debug!(url = %url, "sending Vault request");

            let mut request = self
                .client
                .request(method.as_reqwest(), url)
                .header(TOKEN_HEADER, self.endpoint.token.expose_secret())
                .header(reqwest::header::ACCEPT, "application/json");
            if let Some(namespace) = self.endpoint.namespace.as_deref() {
                request = request.header(NAMESPACE_HEADER, namespace);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|e| {
                debug!(error = %e, "Vault request did not complete");
                SecretsError::transport(e)
            })?;

            let status = response.status();
            debug!(status = status.as_u16(), "Vault response received");

            let text = response.text().await.map_err(SecretsError::transport)?;

            if !status.is_success() {
                trace!(body = %text, "Vault error response");
                return Err(SecretsError::request_failed(
                    status.as_u16(),
                    status_text(status),
                    &text,
                ));
            }

            if text.trim().is_empty() {
                return Ok(None);
            }

            serde_json::from_str(&text).map(Some).map_err(|e| {
                SecretsError::invalid_response(format!("response body is not JSON: {}", e))
            })
        }
        .instrument(span)
        .await
    }
}

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown Status").to_string()
}

fn user_agent() -> String {
    format!("vault-env/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsPolicy;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(base_url: &str) -> Transport {
        Transport::new(EndpointConfig::new(base_url, "test-token")).unwrap()
    }

    #[test]
    fn test_user_agent_contains_version() {
        assert!(user_agent().starts_with("vault-env/"));
    }

    #[test]
    fn test_method_names() {
        assert_eq!(VaultMethod::List.as_reqwest().as_str(), "LIST");
        assert_eq!(VaultMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_url_building() {
        let transport = transport_for("https://vault.local:8200/");
        let url = transport.url_for("kv/metadata/app/", &[("list", "true")]).unwrap();
        assert_eq!(url.as_str(), "https://vault.local:8200/v1/kv/metadata/app/?list=true");

        let url = transport.url_for("/kv/data/my app", &[]).unwrap();
        assert_eq!(url.as_str(), "https://vault.local:8200/v1/kv/data/my%20app");
    }

    #[test]
    fn test_url_building_keeps_base_path() {
        let transport = transport_for("https://proxy.local/vault");
        let url = transport.url_for("sys/capabilities-self", &[]).unwrap();
        assert_eq!(url.as_str(), "https://proxy.local/vault/v1/sys/capabilities-self");
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = Transport::new(EndpointConfig::new("not a url", "t")).unwrap_err();
        assert!(matches!(err, SecretsError::Config { .. }));
    }

    #[test]
    fn test_insecure_transport_builds() {
        let endpoint = EndpointConfig::new("https://vault.local:8200", "t")
            .with_tls(TlsPolicy { verify: false });
        assert!(Transport::new(endpoint).is_ok());
    }

    #[tokio::test]
    async fn test_send_attaches_token_and_decodes_json() {
        let server = MockServer::start().await;
        Mock::given(method("LIST"))
            .and(path("/v1/kv/metadata/"))
            .and(query_param("list", "true"))
            .and(header("x-vault-token", "test-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"keys": ["a"]}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let body = transport_for(&server.uri())
            .send(VaultMethod::List, "kv/metadata/", &[("list", "true")], None)
            .await
            .unwrap();
        assert_eq!(body, Some(serde_json::json!({"data": {"keys": ["a"]}})));
    }

    #[tokio::test]
    async fn test_send_posts_json_body_and_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/kv/data/app"))
            .and(header("x-vault-namespace", "team-a"))
            .and(body_json(serde_json::json!({"data": {"k": "v"}})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = EndpointConfig::new(server.uri(), "test-token").with_namespace("team-a");
        let body = Transport::new(endpoint)
            .unwrap()
            .send(
                VaultMethod::Post,
                "kv/data/app",
                &[],
                Some(&serde_json::json!({"data": {"k": "v"}})),
            )
            .await
            .unwrap();
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_send_maps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/kv/data/locked"))
            .respond_with(
                ResponseTemplate::new(403).set_body_string("{\"errors\":[\"permission denied\"]}"),
            )
            .mount(&server)
            .await;

        let err = transport_for(&server.uri())
            .send(VaultMethod::Get, "kv/data/locked", &[], None)
            .await
            .unwrap_err();
        match err {
            SecretsError::RequestFailed { status, status_text, body_snippet } => {
                assert_eq!(status, 403);
                assert_eq!(status_text, "Forbidden");
                assert!(body_snippet.contains("permission denied"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_rejects_non_json_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = transport_for(&server.uri())
            .send(VaultMethod::Get, "kv/data/app", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, SecretsError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = transport_for(&format!("http://127.0.0.1:{}", port))
            .send(VaultMethod::Get, "kv/data/app", &[], None)
            .await
            .unwrap_err();
        assert!(err.is_transport(), "expected transport error, got {err:?}");
    }
}
