use serde::{Deserialize, Serialize};

/// TLS policy for a single Vault endpoint.
///
/// Verification is on unless explicitly disabled for that endpoint, which is
/// only meant for self-signed or internal deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsPolicy {
    pub verify: bool,
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self { verify: true }
    }
}

impl TlsPolicy {
    /// Policy that skips certificate and hostname checks.
    pub fn insecure() -> Self {
        Self { verify: false }
    }
}

/// Interpret common truthy spellings.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
