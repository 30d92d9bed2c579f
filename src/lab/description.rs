//! JSON lab description.
//!
//! The CLI reads the lab prefix, the lab directory and the node list from a
//! small JSON document:
//!
//! ```json
//! {
//!   "prefix": "wan",
//!   "lab_dir": "./clab-wan",
//!   "nodes": [
//!     { "name": "r1", "kind": "router" },
//!     { "name": "br0", "kind": "bridge" }
//!   ]
//! }
//! ```

use crate::error::{LabPkiError, Result};
use crate::lab::node::Node;
use crate::lab::registry::NodeRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory under the lab directory holding all certificate material.
const CA_DIR: &str = "ca";

/// Directory under [`CA_DIR`] holding the root CA artifacts.
const CA_ROOT_DIR: &str = "root";

/// Node entry of a lab description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSpec {
    pub name: String,

    pub kind: String,

    /// Defaults to `clab-<prefix>-<name>`.
    #[serde(default)]
    pub long_name: Option<String>,

    /// Defaults to `<name>.<prefix>.io`.
    #[serde(default)]
    pub fqdn: Option<String>,

    /// Defaults to `<lab_dir>/ca/<name>`.
    #[serde(default)]
    pub cert_dir: Option<PathBuf>,
}

/// A lab as loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabDescription {
    /// Lab naming prefix.
    pub prefix: String,

    /// Root of the lab's working directory.
    pub lab_dir: PathBuf,

    pub nodes: Vec<NodeSpec>,
}

impl LabDescription {
    /// Load and validate a lab description file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            LabPkiError::ConfigError(format!(
                "Failed to read lab description {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_json(&contents)
    }

    /// Parse and validate a lab description.
    pub fn from_json(json: &str) -> Result<Self> {
        let description: LabDescription = serde_json::from_str(json)?;
        description.validate()?;
        Ok(description)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.name.trim().is_empty() {
                return Err(LabPkiError::ConfigError(
                    "Node name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(node.name.as_str()) {
                return Err(LabPkiError::ConfigError(format!(
                    "Duplicate node name: {}",
                    node.name
                )));
            }
        }
        Ok(())
    }

    /// Directory holding the root CA artifacts.
    pub fn ca_root_dir(&self) -> PathBuf {
        self.lab_dir.join(CA_DIR).join(CA_ROOT_DIR)
    }

    /// Default certificate directory for a node.
    pub fn node_cert_dir(&self, name: &str) -> PathBuf {
        self.lab_dir.join(CA_DIR).join(name)
    }

    /// Build the node registry, filling in defaulted names and directories.
    pub fn registry(&self) -> NodeRegistry {
        self.nodes
            .iter()
            .map(|spec| {
                let long_name = spec
                    .long_name
                    .clone()
                    .unwrap_or_else(|| format!("clab-{}-{}", self.prefix, spec.name));
                let fqdn = spec
                    .fqdn
                    .clone()
                    .unwrap_or_else(|| format!("{}.{}.io", spec.name, self.prefix));
                let cert_dir = spec
                    .cert_dir
                    .clone()
                    .unwrap_or_else(|| self.node_cert_dir(&spec.name));

                Node::new(&spec.name, long_name, fqdn, &spec.kind, cert_dir)
            })
            .collect()
    }
}
