//! Lab node records.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Node kind that never receives a certificate.
pub const BRIDGE_KIND: &str = "bridge";

/// One lab participant and the TLS material issued for it.
///
/// The three TLS fields hold PEM text with newlines escaped as the two
/// characters `\n` (see [`crate::signer::response::escape_newlines`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Short name, unique within the registry.
    pub name: String,

    /// Long name, usually the container name.
    pub long_name: String,

    /// Fully-qualified domain name.
    pub fqdn: String,

    /// Node kind, e.g. `router` or `bridge`.
    pub kind: String,

    /// Directory that receives this node's certificate artifacts.
    pub cert_dir: PathBuf,

    /// Leaf certificate.
    #[serde(default)]
    pub tls_cert: String,

    /// Leaf private key.
    #[serde(default)]
    pub tls_key: String,

    /// Root CA certificate shared by every node.
    #[serde(default)]
    pub tls_anchor: String,
}

impl Node {
    /// Create a node with empty TLS fields.
    pub fn new(
        name: impl Into<String>,
        long_name: impl Into<String>,
        fqdn: impl Into<String>,
        kind: impl Into<String>,
        cert_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            long_name: long_name.into(),
            fqdn: fqdn.into(),
            kind: kind.into(),
            cert_dir: cert_dir.into(),
            tls_cert: String::new(),
            tls_key: String::new(),
            tls_anchor: String::new(),
        }
    }

    /// Whether this node is a bridge and therefore excluded from issuance.
    pub fn is_bridge(&self) -> bool {
        self.kind.trim() == BRIDGE_KIND
    }

    pub fn cert_dir(&self) -> &Path {
        &self.cert_dir
    }

    /// Store a freshly issued certificate and key together.
    ///
    /// Absent values leave the corresponding field untouched.
    pub fn set_tls_identity(&mut self, cert: Option<String>, key: Option<String>) {
        if let Some(cert) = cert {
            self.tls_cert = cert;
        }
        if let Some(key) = key {
            self.tls_key = key;
        }
    }
}
