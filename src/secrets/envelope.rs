//! Decoding of the response envelopes wrapped around secret payloads.
//!
//! KV v2 mounts answer reads with `{"data": {"data": {...}, "metadata": {...}}}`,
//! KV v1 mounts with `{"data": {...}}`. A soft-deleted KV v2 version keeps its
//! metadata but carries `"data": null`.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::{Result, SecretsError};
use super::types::SecretDocument;

#[derive(Debug, Deserialize)]
struct ReadEnvelope {
    data: Map<String, Value>,
}

/// Which envelope shape a read response used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Versioned,
    SoftDeleted,
    Unversioned,
    Empty,
}

/// Decode a read response into the innermost document.
///
/// The versioned shape is tried first. A payload counts as versioned when it
/// carries `metadata`, or when `path` addresses a `{mount}/data/...` document
/// and the payload has a `data` member; otherwise the payload itself is the
/// document. No body decodes to an empty document. A body that matches no
/// known shape is an [`SecretsError::UnrecognizedEnvelope`].
pub fn decode_document(path: &str, body: Option<Value>) -> Result<(SecretDocument, EnvelopeKind)> {
    let Some(body) = body else {
        return Ok((SecretDocument::new(), EnvelopeKind::Empty));
    };

    let mut payload = serde_json::from_value::<ReadEnvelope>(body)
        .map_err(|_| SecretsError::unrecognized_envelope(path))?
        .data;

    let versioned = payload.contains_key("metadata") || (addresses_data(path) && payload.contains_key("data"));
    if !versioned {
        return Ok((payload.into_iter().collect(), EnvelopeKind::Unversioned));
    }

    match payload.remove("data") {
        Some(Value::Object(inner)) => Ok((inner.into_iter().collect(), EnvelopeKind::Versioned)),
        None | Some(Value::Null) => Ok((SecretDocument::new(), EnvelopeKind::SoftDeleted)),
        Some(_) => Err(SecretsError::unrecognized_envelope(path)),
    }
}

/// `kv/data/app` yes, `secret/app` and `kv/data` no.
fn addresses_data(path: &str) -> bool {
    let mut segments = super::path::normalize(path).split('/');
    segments.nth(1) == Some("data") && segments.next().is_some()
}

#[derive(Debug, Deserialize)]
struct ListEnvelope {
    data: Option<ListPayload>,
}

#[derive(Debug, Deserialize)]
struct ListPayload {
    #[serde(default)]
    keys: Vec<String>,
}

/// Child names from a LIST response; anything unusable is an empty listing.
pub fn decode_keys(body: Option<Value>) -> Vec<String> {
    body.and_then(|body| serde_json::from_value::<ListEnvelope>(body).ok())
        .and_then(|envelope| envelope.data)
        .map(|payload| payload.keys)
        .unwrap_or_default()
}
