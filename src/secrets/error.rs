//! Error types for Vault secret operations.

use thiserror::Error;

/// Result type for secrets operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Longest response body excerpt carried by [`SecretsError::RequestFailed`].
pub const BODY_SNIPPET_LIMIT: usize = 256;

/// Errors that can occur while talking to the secret store.
///
/// Empty payloads are not errors: an empty read is an empty document and an
/// empty listing is an empty subtree.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// Connection, DNS, TLS handshake or timeout failure.
    #[error("Transport error: {cause}")]
    Transport {
        cause: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The store answered with a non-success HTTP status.
    #[error("HTTP {status} {status_text}: {body_snippet}")]
    RequestFailed { status: u16, status_text: String, body_snippet: String },

    /// A read payload matched neither the versioned nor the unversioned envelope.
    #[error("Unrecognized secret envelope at '{path}'")]
    UnrecognizedEnvelope { path: String },

    /// A success response carried a body that is not the JSON we expected.
    #[error("Invalid response from Vault: {message}")]
    InvalidResponse { message: String },

    /// The caller supplied a path that cannot be addressed.
    #[error("Invalid secret path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Endpoint configuration could not be turned into a client.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl SecretsError {
    /// Create a transport error from a reqwest failure.
    pub fn transport(source: reqwest::Error) -> Self {
        let cause = if source.is_timeout() {
            format!("request timed out: {}", source)
        } else if source.is_connect() {
            format!("connection failed: {}", source)
        } else {
            source.to_string()
        };
        Self::Transport { cause, source: Some(source) }
    }

    /// Create a transport error without an underlying reqwest error.
    pub fn transport_message(cause: impl Into<String>) -> Self {
        Self::Transport { cause: cause.into(), source: None }
    }

    /// Create a request failed error, truncating the body excerpt.
    pub fn request_failed(status: u16, status_text: impl Into<String>, body: &str) -> Self {
        Self::RequestFailed {
            status,
            status_text: status_text.into(),
            body_snippet: snippet(body),
        }
    }

    /// Create an unrecognized envelope error.
    pub fn unrecognized_envelope(path: impl Into<String>) -> Self {
        Self::UnrecognizedEnvelope { path: path.into() }
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into(), reason: reason.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// HTTP status of a failed request, if the store answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the store could not be reached.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

fn snippet(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= BODY_SNIPPET_LIMIT {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(BODY_SNIPPET_LIMIT).collect();
    cut.push_str("...");
    cut
}
