//! Signer response parsing.
//!
//! Signers answer with a JSON object whose `cert`, `key` and `csr` members are
//! PEM strings. Each member is optional; other members are ignored.

use crate::error::{LabPkiError, Result};
use serde_json::{Map, Value};

/// Parsed signer output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerResponse {
    pub cert: Option<String>,
    pub key: Option<String>,
    pub csr: Option<String>,
}

impl SignerResponse {
    /// Parse raw signer output.
    ///
    /// Fails with `MalformedSignerOutput` unless `raw` is a JSON object whose
    /// `cert`, `key` and `csr` members, when present, are strings.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| LabPkiError::MalformedSignerOutput(e.to_string()))?;

        let object = value.as_object().ok_or_else(|| {
            LabPkiError::MalformedSignerOutput("expected a JSON object".to_string())
        })?;

        Ok(Self {
            cert: string_field(object, "cert")?,
            key: string_field(object, "key")?,
            csr: string_field(object, "csr")?,
        })
    }
}

fn string_field(object: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    match object.get(name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(LabPkiError::MalformedSignerOutput(format!(
            "field '{}' is not a string: {}",
            name, other
        ))),
    }
}

/// Replace every newline with the two characters `\` and `n`.
///
/// Certificates and keys kept on a [`crate::lab::Node`] are embedded later as
/// single-line strings in generated configuration, so they are stored in this
/// escaped form. Artifact files on disk keep real newlines.
///
/// ```
/// use labpki::signer::response::escape_newlines;
///
/// assert_eq!(escape_newlines("A\nB"), "A\\nB");
/// ```
pub fn escape_newlines(pem: &str) -> String {
    pem.replace('\n', "\\n")
}

/// Pretty-print raw signer output for debug logs.
///
/// Output that is not JSON is returned as lossy UTF-8.
pub fn pretty(raw: &[u8]) -> String {
    serde_json::from_slice::<Value>(raw)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(raw).into_owned())
}
