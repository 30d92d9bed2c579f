//! Signer output distribution.
//!
//! Persists the signer's certificate, key and CSR next to each other and
//! hands the certificate (and, for nodes, the key) to the in-memory lab model.

use crate::error::Result;
use crate::lab::{Node, NodeRegistry};
use crate::signer::response::{escape_newlines, SignerResponse};
use crate::storage::fs::create_file;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Who receives the issued material.
#[derive(Debug)]
pub enum Target<'a> {
    /// A leaf for one node: certificate and key are stored on the node.
    Node(&'a mut Node),
    /// The root CA: its certificate becomes every node's trust anchor. The
    /// root key is never handed to nodes.
    AllNodes(&'a mut NodeRegistry),
}

/// The three artifact files derived from a path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
    pub csr: PathBuf,
}

impl ArtifactPaths {
    /// `<prefix>.pem`, `<prefix>-key.pem` and `<prefix>.csr`.
    pub fn new(prefix: &Path) -> Self {
        Self {
            cert: with_suffix(prefix, ".pem"),
            key: with_suffix(prefix, "-key.pem"),
            csr: with_suffix(prefix, ".csr"),
        }
    }
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(prefix.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

/// Parse `raw` signer output and distribute it.
///
/// All three artifacts are written, empty when the response lacks the field.
/// The in-memory model is only touched after every write succeeded, and the
/// node's certificate and key are updated together.
pub fn distribute(raw: &[u8], artifact_prefix: &Path, target: Target<'_>) -> Result<()> {
    let response = SignerResponse::parse(raw)?;
    write_artifacts(&response, &ArtifactPaths::new(artifact_prefix))?;

    let cert = response.cert.as_deref().map(escape_newlines);
    match target {
        Target::Node(node) => {
            let key = response.key.as_deref().map(escape_newlines);
            node.set_tls_identity(cert, key);
            debug!(node = %node.name, "stored TLS certificate and key");
        }
        Target::AllNodes(registry) => {
            if let Some(anchor) = cert {
                registry.broadcast_trust_anchor(&anchor);
                debug!(nodes = registry.len(), "broadcast trust anchor");
            }
        }
    }

    Ok(())
}

fn write_artifacts(response: &SignerResponse, paths: &ArtifactPaths) -> Result<()> {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();

    create_file(&paths.cert, field(&response.cert))?;
    create_file(&paths.key, field(&response.key))?;
    create_file(&paths.csr, field(&response.csr))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LabPkiError;
    use std::fs;
    use tempfile::TempDir;

    fn node(name: &str, dir: &Path) -> Node {
        Node::new(name, format!("clab-{}", name), format!("{}.lab.io", name), "router", dir)
    }

    #[test]
    fn test_artifact_paths() {
        let paths = ArtifactPaths::new(Path::new("/lab/ca/r1/r1"));
        assert_eq!(paths.cert, PathBuf::from("/lab/ca/r1/r1.pem"));
        assert_eq!(paths.key, PathBuf::from("/lab/ca/r1/r1-key.pem"));
        assert_eq!(paths.csr, PathBuf::from("/lab/ca/r1/r1.csr"));
    }

    #[test]
    fn test_artifact_paths_dotted_prefix() {
        let paths = ArtifactPaths::new(Path::new("/lab/r1.core"));
        assert_eq!(paths.cert, PathBuf::from("/lab/r1.core.pem"));
    }

    #[test]
    fn test_distribute_to_node_escapes_in_memory_only() {
        let temp_dir = TempDir::new().unwrap();
        let prefix = temp_dir.path().join("r1");
        let mut r1 = node("r1", temp_dir.path());

        distribute(
            br#"{"cert":"A\nB","key":"K","csr":""}"#,
            &prefix,
            Target::Node(&mut r1),
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("r1.pem")).unwrap(),
            "A\nB"
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("r1-key.pem")).unwrap(),
            "K"
        );
        let csr = temp_dir.path().join("r1.csr");
        assert!(csr.exists());
        assert_eq!(fs::read_to_string(csr).unwrap(), "");

        assert_eq!(r1.tls_cert, "A\\nB");
        assert_eq!(r1.tls_key, "K");
        assert!(r1.tls_anchor.is_empty());
    }

    #[test]
    fn test_distribute_missing_fields_write_empty_files() {
        let temp_dir = TempDir::new().unwrap();
        let prefix = temp_dir.path().join("r1");
        let mut r1 = node("r1", temp_dir.path());
        r1.tls_key = "OLD".to_string();

        distribute(br#"{"cert":"C"}"#, &prefix, Target::Node(&mut r1)).unwrap();

        assert_eq!(
            fs::read_to_string(temp_dir.path().join("r1-key.pem")).unwrap(),
            ""
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("r1.csr")).unwrap(),
            ""
        );
        assert_eq!(r1.tls_cert, "C");
        assert_eq!(r1.tls_key, "OLD");
    }

    #[test]
    fn test_distribute_broadcasts_certificate_not_key() {
        let temp_dir = TempDir::new().unwrap();
        let prefix = temp_dir.path().join("root-ca");
        let mut registry: NodeRegistry = vec![
            node("r1", temp_dir.path()),
            node("r2", temp_dir.path()),
        ]
        .into_iter()
        .collect();

        distribute(
            br#"{"cert":"ROOT\nCERT\n","key":"ROOT KEY","csr":"REQ"}"#,
            &prefix,
            Target::AllNodes(&mut registry),
        )
        .unwrap();

        for n in registry.nodes() {
            assert_eq!(n.tls_anchor, "ROOT\\nCERT\\n");
            assert!(n.tls_cert.is_empty());
            assert!(n.tls_key.is_empty());
        }
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("root-ca-key.pem")).unwrap(),
            "ROOT KEY"
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("root-ca.csr")).unwrap(),
            "REQ"
        );
    }

    #[test]
    fn test_distribute_broadcast_without_cert_keeps_anchor() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry: NodeRegistry = vec![node("r1", temp_dir.path())].into_iter().collect();
        registry.broadcast_trust_anchor("PREVIOUS");

        distribute(
            br#"{"key":"K"}"#,
            &temp_dir.path().join("root-ca"),
            Target::AllNodes(&mut registry),
        )
        .unwrap();

        assert_eq!(registry.get("r1").unwrap().tls_anchor, "PREVIOUS");
    }

    #[test]
    fn test_distribute_malformed_output_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let prefix = temp_dir.path().join("r1");
        let mut r1 = node("r1", temp_dir.path());

        let result = distribute(b"", &prefix, Target::Node(&mut r1));

        assert!(matches!(result, Err(LabPkiError::MalformedSignerOutput(_))));
        assert!(!temp_dir.path().join("r1.pem").exists());
        assert!(r1.tls_cert.is_empty());
    }

    #[test]
    fn test_distribute_write_failure_leaves_node_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let prefix = temp_dir.path().join("absent").join("r1");
        let mut r1 = node("r1", temp_dir.path());

        let result = distribute(br#"{"cert":"C","key":"K"}"#, &prefix, Target::Node(&mut r1));

        assert!(matches!(result, Err(LabPkiError::FileWriteError { .. })));
        assert!(r1.tls_cert.is_empty());
        assert!(r1.tls_key.is_empty());
    }
}
