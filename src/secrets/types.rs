//! Core value types shared by the Vault client components.
//!
//! [`SecretString`] keeps credentials out of logs, [`SecretDocument`] is the
//! flat key/value payload stored at one path.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Key/value content stored at a single secret path.
pub type SecretDocument = BTreeMap<String, serde_json::Value>;

/// A credential wrapper that never prints or serializes its contents.
///
/// Debug shows `SecretString([REDACTED])` and serialization writes
/// `"[REDACTED]"`. Deserialization accepts real values so
/// tokens can be read from profile files. The buffer is zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the raw value. Only for putting it on the wire.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_redacted_in_debug() {
        let token = SecretString::new("hvs.super-secret");
        assert_eq!(format!("{:?}", token), "SecretString([REDACTED])");
        assert_eq!(token.expose_secret(), "hvs.super-secret");
    }

    #[test]
    fn test_token_not_serialized_inside_struct() {
        #[derive(Serialize)]
        struct Profile {
            url: String,
            token: SecretString,
        }

        let profile = Profile {
            url: "https://vault.local:8200".to_string(),
            token: SecretString::new("hvs.hidden"),
        };
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("vault.local"));
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("hvs.hidden"));
    }

    #[test]
    fn test_token_deserializes_real_value() {
        let token: SecretString = serde_json::from_str("\"hvs.abc\"").unwrap();
        assert_eq!(token.expose_secret(), "hvs.abc");
        assert!(!token.is_empty());
        assert!(SecretString::from("").is_empty());
    }
}
