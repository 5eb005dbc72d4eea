//! Secret path handling for KV v2 mounts.
//!
//! Documents live at `{mount}/data/{subpath}` and the same logical node is
//! listed or permanently removed through `{mount}/metadata/{subpath}`. A
//! trailing slash marks a directory.

use super::error::{Result, SecretsError};

const DATA_SEGMENT: &str = "/data/";
const METADATA_SEGMENT: &str = "/metadata/";

/// Strip leading and trailing slashes.
pub fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

/// Reject paths the store cannot address.
pub fn validate(path: &str) -> Result<()> {
    let trimmed = normalize(path);
    if trimmed.is_empty() {
        return Err(SecretsError::invalid_path(path, "path is empty"));
    }
    if trimmed.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(SecretsError::invalid_path(path, "relative segments are not allowed"));
    }
    Ok(())
}

/// Rewrite the first `/data/` segment to `/metadata/`.
///
/// Paths without a data segment, or already addressing metadata, are returned
/// unchanged.
pub fn to_metadata_path(path: &str) -> String {
    let trimmed = normalize(path);
    // Trailing pad so `kv/data` still matches the segment.
    let padded = format!("{}/", trimmed);
    let data_at = padded.find(DATA_SEGMENT);
    let metadata_at = padded.find(METADATA_SEGMENT);
    match data_at {
        Some(index) if metadata_at.map_or(true, |m| m > index) => {
            let mut rewritten = String::with_capacity(padded.len() + 4);
            rewritten.push_str(&padded[..index]);
            rewritten.push_str(METADATA_SEGMENT);
            rewritten.push_str(&padded[index + DATA_SEGMENT.len()..]);
            normalize(&rewritten).to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// Starting point of a tree walk: a mount plus an optional directory prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRoot {
    mount: String,
    prefix: String,
}

impl DiscoveryRoot {
    /// Parse `kv`, `kv/`, `kv/app`, `kv/metadata/app/` or `kv/data/app`.
    ///
    /// The returned prefix is empty or ends with a single `/`.
    pub fn parse(root: &str) -> Result<Self> {
        validate(root)?;
        let trimmed = normalize(root);
        let (mount, rest) = match trimmed.split_once('/') {
            Some((mount, rest)) => (mount, rest),
            None => (trimmed, ""),
        };

        let rest = rest
            .strip_prefix("metadata")
            .or_else(|| rest.strip_prefix("data"))
            .filter(|remainder| remainder.is_empty() || remainder.starts_with('/'))
            .unwrap_or(rest);
        let rest = normalize(rest);

        let prefix = if rest.is_empty() { String::new() } else { format!("{}/", rest) };
        Ok(Self { mount: mount.to_string(), prefix })
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Listing path for a directory prefix relative to the mount.
    pub fn list_path(&self, prefix: &str) -> String {
        format!("{}/metadata/{}", self.mount, prefix)
    }

    /// Document path of a leaf found under `prefix`.
    pub fn leaf_path(&self, prefix: &str, name: &str) -> String {
        format!("{}/data/{}{}", self.mount, prefix, name)
    }
}

impl std::fmt::Display for DiscoveryRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.mount, self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_metadata_rewrite() {
        assert_eq!(to_metadata_path("kv/data/app/db"), "kv/metadata/app/db");
        assert_eq!(to_metadata_path("/kv/data/app/db/"), "kv/metadata/app/db");
        assert_eq!(to_metadata_path("kv/metadata/app/db"), "kv/metadata/app/db");
        assert_eq!(to_metadata_path("secret/app"), "secret/app");
    }

    #[test]
    fn test_metadata_rewrite_only_first_segment() {
        assert_eq!(to_metadata_path("kv/data/data/x"), "kv/metadata/data/x");
        assert_eq!(to_metadata_path("data/data/x"), "data/metadata/x");
    }

    #[test]
    fn test_validate_rejects_empty_and_relative() {
        assert!(validate("").is_err());
        assert!(validate("///").is_err());
        assert!(validate("kv/../sys").is_err());
        assert!(validate("kv/./x").is_err());
        assert!(validate("kv/data/app").is_ok());
    }

    #[test]
    fn test_root_parsing() {
        let root = DiscoveryRoot::parse("kv").unwrap();
        assert_eq!(root.mount(), "kv");
        assert_eq!(root.prefix(), "");
        assert_eq!(root.list_path(root.prefix()), "kv/metadata/");

        let root = DiscoveryRoot::parse("kv/app/").unwrap();
        assert_eq!(root.prefix(), "app/");
        assert_eq!(root.leaf_path("app/", "db"), "kv/data/app/db");

        let root = DiscoveryRoot::parse("kv/metadata/app/team").unwrap();
        assert_eq!(root.prefix(), "app/team/");

        let root = DiscoveryRoot::parse("kv/data/").unwrap();
        assert_eq!(root.prefix(), "");
    }

    #[test]
    fn test_root_keeps_directories_named_like_segments() {
        let root = DiscoveryRoot::parse("kv/database/").unwrap();
        assert_eq!(root.prefix(), "database/");
    }

    #[test]
    fn test_root_rejects_empty() {
        assert!(DiscoveryRoot::parse("/").is_err());
    }

    proptest! {
        #[test]
        fn prop_metadata_rewrite_replaces_data_segment(
            mount in "[a-z]{1,8}",
            rest in proptest::collection::vec("[a-z0-9_-]{1,8}", 1..5),
        ) {
            let subpath = rest.join("/");
            let rewritten = to_metadata_path(&format!("{}/data/{}", mount, subpath));
            prop_assert_eq!(rewritten, format!("{}/metadata/{}", mount, subpath));
        }

        #[test]
        fn prop_metadata_rewrite_is_idempotent(path in "[a-z]{1,6}(/[a-z]{1,6}){0,4}") {
            let once = to_metadata_path(&path);
            prop_assert_eq!(to_metadata_path(&once), once.clone());
        }
    }
}
