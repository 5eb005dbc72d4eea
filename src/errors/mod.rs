//! # Error Handling
//!
//! Application level errors. Store interaction failures keep their own
//! taxonomy in [`crate::secrets::SecretsError`] and are wrapped here so the
//! command line layer deals with a single type.

use crate::secrets::SecretsError;

/// Custom result type for vault-env operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vault-env
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration values outside their allowed range
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failures talking to the secret store
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect();
        fields.sort();

        Self::validation(fields.join("; "))
    }
}
