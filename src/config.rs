//! Certificate authority configuration.
//!
//! [`CaContext`] is built once per run, either from a lab description plus
//! CLI overrides or directly in code, and is read-only afterwards.

use crate::error::{LabPkiError, Result};
use crate::lab::LabDescription;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Namespace prepended to the lab prefix in the root CA request.
pub const ROOT_CA_NAMESPACE: &str = "containerlab";

/// Base name of the root CA artifacts.
pub const ROOT_CA_NAME: &str = "root-ca";

/// Default `cfssl` executable name, resolved through `PATH`.
pub const DEFAULT_CFSSL: &str = "cfssl";

/// Which signer implementation issues certificates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignerBackend {
    /// External `cfssl` subprocess.
    #[default]
    Cfssl,
    /// In-process Ed25519 issuance.
    Local,
}

impl FromStr for SignerBackend {
    type Err = LabPkiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cfssl" => Ok(SignerBackend::Cfssl),
            "local" => Ok(SignerBackend::Local),
            _ => Err(LabPkiError::ConfigError(format!(
                "Unsupported signer: '{}'. Use 'cfssl' or 'local'",
                s
            ))),
        }
    }
}

/// Signer settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignerConfig {
    #[serde(default)]
    pub backend: SignerBackend,

    /// Executable used by the `cfssl` backend.
    #[serde(default = "default_cfssl")]
    pub executable: PathBuf,

    /// Arguments placed before the `gencert` arguments.
    #[serde(default)]
    pub leading_args: Vec<String>,

    /// Subprocess timeout in seconds; no timeout when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_cfssl() -> PathBuf {
    PathBuf::from(DEFAULT_CFSSL)
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            backend: SignerBackend::default(),
            executable: default_cfssl(),
            leading_args: Vec::new(),
            timeout_secs: None,
        }
    }
}

impl SignerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Process-wide CA settings shared by root and node issuance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaContext {
    /// Directory holding the root CA artifacts.
    pub ca_root_dir: PathBuf,

    /// Lab naming prefix.
    pub prefix: String,

    /// Log signer output pretty-printed.
    #[serde(default)]
    pub debug: bool,

    /// Root CSR template override; the embedded default is used when absent.
    #[serde(default)]
    pub root_template: Option<PathBuf>,

    /// Node CSR template override; the embedded default is used when absent.
    #[serde(default)]
    pub node_template: Option<PathBuf>,

    #[serde(default)]
    pub signer: SignerConfig,
}

impl CaContext {
    pub fn new(ca_root_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            ca_root_dir: ca_root_dir.into(),
            prefix: prefix.into(),
            debug: false,
            root_template: None,
            node_template: None,
            signer: SignerConfig::default(),
        }
    }

    /// Context for a lab loaded from a description file.
    pub fn for_lab(lab: &LabDescription) -> Self {
        Self::new(lab.ca_root_dir(), &lab.prefix)
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_root_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_template = Some(path.into());
        self
    }

    pub fn with_node_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.node_template = Some(path.into());
        self
    }

    pub fn with_signer(mut self, signer: SignerConfig) -> Self {
        self.signer = signer;
        self
    }

    /// Organization prefix placed in the root CA request.
    pub fn root_prefix(&self) -> String {
        format!("{}-{}", ROOT_CA_NAMESPACE, self.prefix)
    }

    /// Root CA certificate path.
    pub fn root_cert_path(&self) -> PathBuf {
        self.ca_root_dir.join(format!("{}.pem", ROOT_CA_NAME))
    }

    /// Root CA private key path.
    pub fn root_key_path(&self) -> PathBuf {
        self.ca_root_dir.join(format!("{}-key.pem", ROOT_CA_NAME))
    }

    /// Artifact path prefix for the root CA.
    pub fn root_artifact_prefix(&self) -> PathBuf {
        self.ca_root_dir.join(ROOT_CA_NAME)
    }

    /// Rendered root CSR descriptor path.
    pub fn root_request_path(&self) -> PathBuf {
        self.ca_root_dir.join(format!("csr-{}.json", ROOT_CA_NAME))
    }
}
