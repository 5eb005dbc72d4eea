//! Capability resolution through `sys/capabilities-self`.
//!
//! The store reports, per path, the operations the current token may perform.
//! A path that is missing from the answer, or comes back with no tokens, has
//! no access.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::error::Result;
use super::transport::{Transport, VaultMethod};

pub const CAPABILITIES_PATH: &str = "sys/capabilities-self";

/// A single permission label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    List,
    Create,
    Update,
    Delete,
    Sudo,
    Deny,
}

impl Capability {
    /// Every capability a `root` token implies.
    pub const GRANTING: [Capability; 6] = [
        Capability::Read,
        Capability::List,
        Capability::Create,
        Capability::Update,
        Capability::Delete,
        Capability::Sudo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::List => "list",
            Capability::Create => "create",
            Capability::Update => "update",
            Capability::Delete => "delete",
            Capability::Sudo => "sudo",
            Capability::Deny => "deny",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "read" => Ok(Capability::Read),
            "list" => Ok(Capability::List),
            "create" => Ok(Capability::Create),
            "update" => Ok(Capability::Update),
            "delete" => Ok(Capability::Delete),
            "sudo" => Ok(Capability::Sudo),
            "deny" => Ok(Capability::Deny),
            other => Err(format!("unknown capability '{}'", other)),
        }
    }
}

/// The capabilities granted on one path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the token list returned by the store.
    ///
    /// `root` expands to every granting capability; unknown labels such as
    /// `patch` are skipped.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for token in tokens {
            let token = token.as_ref();
            if token == "root" {
                set.extend(Capability::GRANTING);
                continue;
            }
            match token.parse::<Capability>() {
                Ok(capability) => {
                    set.insert(capability);
                }
                Err(reason) => debug!(token = %token, %reason, "ignoring capability token"),
            }
        }
        Self(set)
    }

    /// True when `capability` is granted and not overridden by `deny`.
    pub fn allows(&self, capability: Capability) -> bool {
        !self.0.contains(&Capability::Deny) && self.0.contains(&capability)
    }

    pub fn can_read(&self) -> bool {
        self.allows(Capability::Read)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// Space separated labels, e.g. `read list update`.
    pub fn tags(&self) -> String {
        self.iter().map(Capability::as_str).collect::<Vec<_>>().join(" ")
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Capabilities per secret path for the current token.
pub type AccessGrant = BTreeMap<String, CapabilitySet>;

/// Ask the store which operations the token may perform on each path.
///
/// Sends a single batched request. An empty input issues no request.
pub async fn check_access<I, S>(transport: &Transport, paths: I) -> Result<AccessGrant>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let paths: BTreeSet<String> = paths.into_iter().map(|p| p.as_ref().to_string()).collect();
    if paths.is_empty() {
        return Ok(AccessGrant::new());
    }

    let body = json!({ "paths": paths });
    let response = transport.send(VaultMethod::Post, CAPABILITIES_PATH, &[], Some(&body)).await?;

    let grant = parse_grant(&paths, response.as_ref());
    debug!(requested = paths.len(), granted = grant.len(), "resolved capabilities");
    Ok(grant)
}

/// Pick the requested paths out of a capabilities response.
///
/// Paths the response does not mention are left out of the grant.
fn parse_grant(paths: &BTreeSet<String>, response: Option<&Value>) -> AccessGrant {
    let Some(data) = response.and_then(|body| body.get("data")) else {
        return AccessGrant::new();
    };

    paths
        .iter()
        .filter_map(|path| {
            let tokens = data.get(path)?.as_array()?;
            let set = CapabilitySet::from_tokens(tokens.iter().filter_map(Value::as_str));
            Some((path.clone(), set))
        })
        .collect()
}
