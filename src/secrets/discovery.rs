//! Recursive discovery of secret paths below a KV v2 root.
//!
//! A LIST only returns one directory level, so the walk keeps a queue of
//! pending directories and drains it with a bounded number of concurrent
//! requests. Results are merged by the single driver loop, which owns the
//! leaf set, so duplicates collapse no matter which branch finishes first.
//!
//! A branch whose LIST fails or comes back empty contributes nothing; the
//! failure is recorded in the report and the rest of the tree is still walked.
//! The walk stops descending at `max_depth` and gives up at the deadline,
//! returning whatever was reached.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet, VecDeque};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::capabilities::{AccessGrant, CapabilitySet};
use super::envelope::decode_keys;
use super::error::Result;
use super::path::DiscoveryRoot;
use super::transport::{Transport, VaultMethod};
use crate::config::DiscoveryConfig;

/// A directory whose listing failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchFailure {
    pub path: String,
    pub reason: String,
}

/// Raw outcome of one tree walk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    /// Leaf document paths, `{mount}/data/{subpath}`
    pub leaves: BTreeSet<String>,

    /// Directories whose LIST failed and were treated as empty
    pub failed_branches: Vec<BranchFailure>,

    /// Directories not descended because of the depth bound
    pub depth_limited: Vec<String>,

    /// The deadline expired before the queue was drained
    pub timed_out: bool,
}

impl DiscoveryReport {
    /// True when some part of the tree was deliberately not visited.
    pub fn is_truncated(&self) -> bool {
        self.timed_out || !self.depth_limited.is_empty()
    }
}

/// A readable secret and the capabilities held on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredPath {
    pub path: String,
    pub access: CapabilitySet,
}

/// A discovered path dropped because the token cannot read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessWarning {
    pub path: String,
    pub message: String,
}

/// Discovery filtered down to readable paths.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryResult {
    pub paths: Vec<DiscoveredPath>,
    pub warnings: Vec<AccessWarning>,
    pub failed_branches: Vec<BranchFailure>,
    pub truncated: bool,
}

/// Walks the listing tree of one endpoint.
#[derive(Debug, Clone)]
pub struct PathDiscoverer {
    transport: Transport,
    config: DiscoveryConfig,
}

impl PathDiscoverer {
    pub fn new(transport: Transport, config: DiscoveryConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Collect every leaf path below `root`.
    ///
    /// Only an unparseable root is an error; listing failures end up in the
    /// report.
    pub async fn discover(&self, root: &str) -> Result<DiscoveryReport> {
        let root = DiscoveryRoot::parse(root)?;
        let max_depth = self.config.max_depth;
        let concurrency = self.config.concurrency.max(1);

        info!(root = %root, max_depth, concurrency, "starting secret discovery");

        let mut report = DiscoveryReport::default();
        let mut visited: HashSet<String> = HashSet::new();
        let mut pending: VecDeque<(String, usize)> = VecDeque::new();
        let mut in_flight: JoinSet<(String, usize, Result<Vec<String>>)> = JoinSet::new();

        visited.insert(root.prefix().to_string());
        pending.push_back((root.prefix().to_string(), 0));

        let deadline = tokio::time::sleep(self.config.deadline());
        tokio::pin!(deadline);

        loop {
            while in_flight.len() < concurrency {
                let Some((prefix, depth)) = pending.pop_front() else {
                    break;
                };
                let transport = self.transport.clone();
                let list_path = root.list_path(&prefix);
                in_flight.spawn(async move {
                    let outcome = list_children(&transport, &list_path).await;
                    (prefix, depth, outcome)
                });
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                _ = &mut deadline => {
                    warn!(
                        root = %root,
                        pending = pending.len() + in_flight.len(),
                        found = report.leaves.len(),
                        "discovery deadline reached, returning partial result"
                    );
                    report.timed_out = true;
                    in_flight.abort_all();
                    break;
                }
                joined = in_flight.join_next() => {
                    let Some(joined) = joined else {
                        break;
                    };
                    match joined {
                        Ok((prefix, depth, Ok(keys))) => {
                            merge_listing(&root, &prefix, depth, max_depth, keys, &mut visited, &mut pending, &mut report);
                        }
                        Ok((prefix, _, Err(err))) => {
                            let path = root.list_path(&prefix);
                            warn!(path = %path, error = %err, "listing failed, treating subtree as empty");
                            report.failed_branches.push(BranchFailure { path, reason: err.to_string() });
                        }
                        Err(join_err) => {
                            warn!(error = %join_err, "listing task did not complete");
                        }
                    }
                }
            }
        }

        info!(
            root = %root,
            leaves = report.leaves.len(),
            failed = report.failed_branches.len(),
            truncated = report.is_truncated(),
            "secret discovery finished"
        );
        Ok(report)
    }
}

async fn list_children(transport: &Transport, list_path: &str) -> Result<Vec<String>> {
    let body = transport.send(VaultMethod::List, list_path, &[("list", "true")], None).await?;
    Ok(decode_keys(body))
}

#[allow(clippy::too_many_arguments)]
fn merge_listing(
    root: &DiscoveryRoot,
    prefix: &str,
    depth: usize,
    max_depth: usize,
    keys: Vec<String>,
    visited: &mut HashSet<String>,
    pending: &mut VecDeque<(String, usize)>,
    report: &mut DiscoveryReport,
) {
    debug!(prefix = %prefix, children = keys.len(), "merging listing");

    for key in keys {
        let name = key.trim_start_matches('/');
        if matches!(name.trim_end_matches('/'), "" | "." | "..") {
            debug!(key = %key, prefix = %prefix, "skipping unusable key");
            continue;
        }

        if name.ends_with('/') {
            let child = format!("{}{}", prefix, name);
            if depth + 1 > max_depth {
                report.depth_limited.push(child);
                continue;
            }
            if visited.insert(child.clone()) {
                pending.push_back((child, depth + 1));
            }
        } else {
            report.leaves.insert(root.leaf_path(prefix, name));
        }
    }
}

/// Keep only the leaves the token can read.
///
/// Every dropped path produces a warning, both in the result and in the log.
pub fn filter_readable(report: DiscoveryReport, grant: &AccessGrant) -> DiscoveryResult {
    let truncated = report.is_truncated();
    let mut result = DiscoveryResult {
        failed_branches: report.failed_branches,
        truncated,
        ..DiscoveryResult::default()
    };

    for path in report.leaves {
        match grant.get(&path) {
            Some(access) if access.can_read() => {
                result.paths.push(DiscoveredPath { path, access: access.clone() });
            }
            _ => {
                warn!(path = %path, "No read access to path");
                result.warnings.push(AccessWarning {
                    message: format!("No read access to path: {}", path),
                    path,
                });
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use serde_json::json;
    use std::time::Duration;
    use tracing_test::traced_test;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn keys(keys: &[&str]) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "data": { "keys": keys } }))
    }

    async fn mount_listing(server: &MockServer, list_path: &str, response: ResponseTemplate) {
        Mock::given(method("LIST")).and(path(list_path)).respond_with(response).mount(server).await;
    }

    fn discoverer(server: &MockServer, config: DiscoveryConfig) -> PathDiscoverer {
        let transport = Transport::new(EndpointConfig::new(server.uri(), "t")).unwrap();
        PathDiscoverer::new(transport, config)
    }

    #[test]
    fn test_merge_listing_dedups_and_bounds_depth() {
        let root = DiscoveryRoot::parse("kv").unwrap();
        let mut visited = HashSet::new();
        let mut pending = VecDeque::new();
        let mut report = DiscoveryReport::default();

        merge_listing(
            &root,
            "",
            0,
            1,
            vec!["a".into(), "a".into(), "b/".into(), "b/".into(), "".into(), "../".into()],
            &mut visited,
            &mut pending,
            &mut report,
        );
        assert_eq!(report.leaves.len(), 1);
        assert!(report.leaves.contains("kv/data/a"));
        assert_eq!(pending, VecDeque::from([("b/".to_string(), 1)]));

        merge_listing(&root, "b/", 1, 1, vec!["c/".into()], &mut visited, &mut pending, &mut report);
        assert_eq!(report.depth_limited, vec!["b/c/".to_string()]);
        assert!(report.is_truncated());
    }

    #[tokio::test]
    async fn test_empty_subdirectory_contributes_nothing() {
        let server = MockServer::start().await;
        mount_listing(&server, "/v1/kv/metadata/", keys(&["a", "b/"])).await;
        mount_listing(&server, "/v1/kv/metadata/b/", ResponseTemplate::new(404).set_body_json(json!({"errors": []}))).await;

        let report = discoverer(&server, DiscoveryConfig::default()).discover("kv").await.unwrap();
        assert_eq!(report.leaves, BTreeSet::from(["kv/data/a".to_string()]));
        assert_eq!(report.failed_branches.len(), 1);
        assert!(!report.is_truncated());
    }

    #[tokio::test]
    async fn test_nested_walk_from_subfolder_root() {
        let server = MockServer::start().await;
        mount_listing(&server, "/v1/kv/metadata/app/", keys(&["db", "cache/"])).await;
        mount_listing(&server, "/v1/kv/metadata/app/cache/", keys(&["redis"])).await;

        let report = discoverer(&server, DiscoveryConfig::default()).discover("kv/app").await.unwrap();
        let expected: BTreeSet<String> =
            ["kv/data/app/db", "kv/data/app/cache/redis"].iter().map(|s| s.to_string()).collect();
        assert_eq!(report.leaves, expected);
    }

    #[tokio::test]
    async fn test_deadline_returns_partial_result() {
        let server = MockServer::start().await;
        mount_listing(&server, "/v1/kv/metadata/", keys(&["top", "slow/"])).await;
        mount_listing(&server, "/v1/kv/metadata/slow/", keys(&["never"]).set_delay(Duration::from_secs(5))).await;

        let config = DiscoveryConfig { deadline_seconds: 1, ..DiscoveryConfig::default() };
        let report = discoverer(&server, config).discover("kv").await.unwrap();
        assert!(report.timed_out);
        assert!(report.leaves.contains("kv/data/top"));
        assert!(!report.leaves.contains("kv/data/slow/never"));
    }

    #[tokio::test]
    async fn test_invalid_root_is_error() {
        let server = MockServer::start().await;
        assert!(discoverer(&server, DiscoveryConfig::default()).discover("").await.is_err());
    }

    #[test]
    #[traced_test]
    fn test_filter_readable_drops_and_warns() {
        let report = DiscoveryReport {
            leaves: ["kv/data/a", "kv/data/b", "kv/data/c"].iter().map(|s| s.to_string()).collect(),
            ..DiscoveryReport::default()
        };
        let mut grant = AccessGrant::new();
        grant.insert("kv/data/a".into(), CapabilitySet::from_tokens(["read", "list"]));
        grant.insert("kv/data/b".into(), CapabilitySet::new());

        let result = filter_readable(report, &grant);
        assert_eq!(result.paths.len(), 1);
        assert_eq!(result.paths[0].path, "kv/data/a");
        let warned: Vec<&str> = result.warnings.iter().map(|w| w.path.as_str()).collect();
        assert_eq!(warned, vec!["kv/data/b", "kv/data/c"]);
        assert!(logs_contain("No read access to path"));
    }
}
