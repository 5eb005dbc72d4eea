//! Common test utilities for all integration tests.
//!
//! Provides an in-memory KV v2 store served through wiremock, so tests can
//! write, read, list and delete secrets and control capability answers.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use vault_env::config::EndpointConfig;
use vault_env::secrets::{SecretDocument, VaultClient};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const TEST_TOKEN: &str = "hvs.test-token";

#[derive(Default)]
struct StoreState {
    /// Documents per mount, keyed by subpath
    documents: BTreeMap<String, BTreeMap<String, SecretDocument>>,
    /// Capability tokens per full data path; unknown paths get `default_capabilities`
    capabilities: BTreeMap<String, Vec<String>>,
    default_capabilities: Vec<String>,
    /// Listing paths (`{mount}/metadata/{prefix}`) that answer 403
    forbidden_listings: BTreeSet<String>,
}

/// In-memory KV v2 server.
#[derive(Clone)]
pub struct FakeVault {
    state: Arc<Mutex<StoreState>>,
}

impl FakeVault {
    pub fn new() -> Self {
        let state = StoreState {
            default_capabilities: vec!["read".to_string(), "list".to_string()],
            ..StoreState::default()
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Mount the fake on a fresh mock server.
    pub async fn start(&self) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(any()).respond_with(self.clone()).mount(&server).await;
        server
    }

    pub fn insert(&self, mount: &str, subpath: &str, document: Value) {
        let document: SecretDocument = serde_json::from_value(document).expect("object document");
        let mut state = self.state.lock().expect("store lock");
        state.documents.entry(mount.to_string()).or_default().insert(subpath.to_string(), document);
    }

    pub fn get(&self, mount: &str, subpath: &str) -> Option<SecretDocument> {
        let state = self.state.lock().expect("store lock");
        state.documents.get(mount).and_then(|docs| docs.get(subpath)).cloned()
    }

    pub fn set_capabilities(&self, path: &str, tokens: &[&str]) {
        let mut state = self.state.lock().expect("store lock");
        state.capabilities.insert(path.to_string(), tokens.iter().map(|t| t.to_string()).collect());
    }

    pub fn forbid_listing(&self, list_path: &str) {
        let mut state = self.state.lock().expect("store lock");
        state.forbidden_listings.insert(list_path.to_string());
    }

    fn handle(&self, method: &str, path: &str, body: Option<Value>) -> ResponseTemplate {
        let path = path.trim_start_matches("/v1/");
        if path == "sys/capabilities-self" {
            return self.capabilities(body);
        }

        let Some((mount, rest)) = path.split_once('/') else {
            return not_found();
        };

        match (method, rest.split_once('/')) {
            ("GET", Some(("data", subpath))) => self.read(mount, subpath),
            ("POST", Some(("data", subpath))) => self.write(mount, subpath, body),
            ("DELETE", Some(("metadata", subpath))) => self.delete(mount, subpath),
            ("LIST", Some(("metadata", prefix))) => self.list(mount, prefix),
            ("LIST", None) if rest == "metadata" => self.list(mount, ""),
            _ => ResponseTemplate::new(405).set_body_json(json!({"errors": ["unsupported operation"]})),
        }
    }

    fn read(&self, mount: &str, subpath: &str) -> ResponseTemplate {
        match self.get(mount, subpath) {
            Some(document) => ResponseTemplate::new(200).set_body_json(json!({
                "data": {"data": document, "metadata": {"version": 1}}
            })),
            None => not_found(),
        }
    }

    fn write(&self, mount: &str, subpath: &str, body: Option<Value>) -> ResponseTemplate {
        let Some(document) = body
            .and_then(|b| b.get("data").cloned())
            .and_then(|d| serde_json::from_value::<SecretDocument>(d).ok())
        else {
            return ResponseTemplate::new(400).set_body_json(json!({"errors": ["no data provided"]}));
        };

        let mut state = self.state.lock().expect("store lock");
        state.documents.entry(mount.to_string()).or_default().insert(subpath.to_string(), document);
        ResponseTemplate::new(200).set_body_json(json!({"data": {"version": 1}}))
    }

    fn delete(&self, mount: &str, subpath: &str) -> ResponseTemplate {
        let mut state = self.state.lock().expect("store lock");
        if let Some(docs) = state.documents.get_mut(mount) {
            docs.remove(subpath);
        }
        ResponseTemplate::new(204)
    }

    fn list(&self, mount: &str, prefix: &str) -> ResponseTemplate {
        let state = self.state.lock().expect("store lock");
        if state.forbidden_listings.contains(&format!("{}/metadata/{}", mount, prefix)) {
            return ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]}));
        }

        let mut keys = BTreeSet::new();
        for subpath in state.documents.get(mount).into_iter().flat_map(|docs| docs.keys()) {
            let Some(rest) = subpath.strip_prefix(prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => keys.insert(format!("{}/", dir)),
                None => keys.insert(rest.to_string()),
            };
        }

        if keys.is_empty() {
            return not_found();
        }
        ResponseTemplate::new(200).set_body_json(json!({"data": {"keys": keys}}))
    }

    fn capabilities(&self, body: Option<Value>) -> ResponseTemplate {
        let state = self.state.lock().expect("store lock");
        let paths: Vec<String> = body
            .and_then(|b| b.get("paths").cloned())
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        let mut data = serde_json::Map::new();
        for path in paths {
            let tokens = state
                .capabilities
                .get(&path)
                .cloned()
                .unwrap_or_else(|| state.default_capabilities.clone());
            data.insert(path, json!(tokens));
        }
        ResponseTemplate::new(200).set_body_json(json!({ "data": data }))
    }
}

impl Respond for FakeVault {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if request.headers.get("X-Vault-Token").and_then(|v| v.to_str().ok()) != Some(TEST_TOKEN) {
            return ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]}));
        }
        let body = request.body_json::<Value>().ok();
        self.handle(request.method.as_str(), request.url.path(), body)
    }
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({"errors": []}))
}

pub fn client_for(server: &MockServer) -> VaultClient {
    VaultClient::new(EndpointConfig::new(server.uri(), TEST_TOKEN)).expect("client")
}

/// An address with nothing listening on it.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}
