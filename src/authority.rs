//! Certificate authority orchestration.
//!
//! [`CertificateAuthority::create_root_ca`] bootstraps the lab's root CA and
//! broadcasts its certificate to every node; [`CertificateAuthority::create_cert`]
//! issues one node's leaf. Each call runs directory creation, template
//! rendering, signing and distribution in that order and stops at the first
//! failing step.

use crate::config::CaContext;
use crate::distribute::{distribute, Target};
use crate::error::{LabPkiError, Result};
use crate::lab::NodeRegistry;
use crate::signer::response::pretty;
use crate::signer::{SignMode, Signer};
use crate::storage::fs::create_directory;
use crate::template::{NodeCsrParams, RootCsrParams, TemplateRenderer};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Issues the root CA and node certificates of one lab.
#[derive(Debug)]
pub struct CertificateAuthority<S: Signer> {
    ctx: CaContext,
    signer: S,
    renderer: TemplateRenderer,
    root_ready: bool,
}

impl<S: Signer> CertificateAuthority<S> {
    /// Create an authority using the templates configured in `ctx`.
    pub fn new(ctx: CaContext, signer: S) -> Self {
        let renderer = TemplateRenderer::from_context(&ctx);
        Self::with_renderer(ctx, signer, renderer)
    }

    /// Create an authority with an explicit renderer.
    pub fn with_renderer(ctx: CaContext, signer: S, renderer: TemplateRenderer) -> Self {
        Self {
            ctx,
            signer,
            renderer,
            root_ready: false,
        }
    }

    /// The context this authority was created with.
    pub fn context(&self) -> &CaContext {
        &self.ctx
    }

    /// Whether [`Self::create_root_ca`] has succeeded.
    pub fn root_ready(&self) -> bool {
        self.root_ready
    }

    /// Create the root CA and set it as every node's trust anchor.
    ///
    /// Every call invokes the signer again and overwrites the previous root
    /// artifacts. Node issuance stays blocked until the call succeeds, even if
    /// an earlier root was ready.
    pub fn create_root_ca(&mut self, registry: &mut NodeRegistry) -> Result<()> {
        self.root_ready = false;
        info!(dir = %self.ctx.ca_root_dir.display(), "Creating root CA");
        create_directory(&self.ctx.ca_root_dir)?;

        let request = self.ctx.root_request_path();
        let params = RootCsrParams {
            prefix: self.ctx.root_prefix(),
        };
        self.renderer.render_root(&params, &request)?;

        let raw = self.sign(&request, &SignMode::InitializeCa, "initca")?;
        distribute(
            &raw,
            &self.ctx.root_artifact_prefix(),
            Target::AllNodes(registry),
        )?;

        self.root_ready = true;
        info!(nodes = registry.len(), "Root CA created");
        Ok(())
    }

    /// Issue a leaf certificate for the node named `short_name`.
    ///
    /// Bridge nodes are skipped without touching the filesystem.
    pub fn create_cert(&self, registry: &mut NodeRegistry, short_name: &str) -> Result<()> {
        let node = registry
            .get_mut(short_name)
            .ok_or_else(|| LabPkiError::UnknownNode(short_name.to_string()))?;

        if node.is_bridge() {
            debug!(node = short_name, "skipping bridge node");
            return Ok(());
        }
        if !self.root_ready {
            return Err(LabPkiError::RootCaNotReady);
        }

        info!(node = short_name, "Creating certificate");
        create_directory(node.cert_dir())?;

        let request = node.cert_dir().join(format!("csr-{}.json", short_name));
        let params = NodeCsrParams {
            name: short_name.to_string(),
            long_name: node.long_name.clone(),
            fqdn: node.fqdn.clone(),
            prefix: self.ctx.prefix.clone(),
        };
        self.renderer.render_node(&params, &request)?;

        let mode = SignMode::SignWithCa {
            ca_cert: self.ctx.root_cert_path(),
            ca_key: self.ctx.root_key_path(),
        };
        let raw = self.sign(&request, &mode, "sign with root CA")?;

        let prefix = node.cert_dir().join(short_name);
        distribute(&raw, &prefix, Target::Node(&mut *node))?;

        debug!(node = short_name, dir = %node.cert_dir().display(), "certificate stored");
        Ok(())
    }

    /// Issue certificates for every node, in name order.
    ///
    /// A failing node does not stop the others; each node's outcome is
    /// returned alongside its name.
    pub fn create_certs(&self, registry: &mut NodeRegistry) -> Vec<(String, Result<()>)> {
        registry
            .names()
            .into_iter()
            .map(|name| {
                let result = self.create_cert(registry, &name);
                if let Err(e) = &result {
                    warn!(node = %name, error = %e, "certificate issuance failed");
                }
                (name, result)
            })
            .collect()
    }

    fn sign(&self, request: &Path, mode: &SignMode, what: &str) -> Result<Vec<u8>> {
        let raw = self.signer.sign(request, mode).map_err(|e| {
            error!(error = %e, "signer {} request failed", what);
            e
        })?;

        if self.ctx.debug {
            debug!("signer {} output:\n{}", what, pretty(&raw));
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lab::Node;
    use crate::signer::LocalSigner;
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Signer answering from a script of canned results, recording requests.
    struct ScriptedSigner {
        replies: RefCell<Vec<Result<Vec<u8>>>>,
        calls: RefCell<Vec<(PathBuf, SignMode)>>,
    }

    impl ScriptedSigner {
        fn new(replies: Vec<Result<Vec<u8>>>) -> Self {
            Self {
                replies: RefCell::new(replies),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Signer for ScriptedSigner {
        fn sign(&self, request: &Path, mode: &SignMode) -> Result<Vec<u8>> {
            self.calls
                .borrow_mut()
                .push((request.to_path_buf(), mode.clone()));
            self.replies.borrow_mut().remove(0)
        }
    }

    fn lab(dir: &Path) -> (CaContext, NodeRegistry) {
        let ctx = CaContext::new(dir.join("ca").join("root"), "wan");
        let registry = vec![
            Node::new("r1", "clab-wan-r1", "r1.wan.io", "router", dir.join("ca").join("r1")),
            Node::new("br0", "clab-wan-br0", "br0.wan.io", "bridge", dir.join("ca").join("br0")),
        ]
        .into_iter()
        .collect();
        (ctx, registry)
    }

    #[test]
    fn test_create_root_ca_renders_and_signs() {
        let temp_dir = TempDir::new().unwrap();
        let (ctx, mut registry) = lab(temp_dir.path());
        let signer = ScriptedSigner::new(vec![Ok(br#"{"cert":"ROOT","key":"RK","csr":"RC"}"#.to_vec())]);
        let mut ca = CertificateAuthority::new(ctx.clone(), &signer);

        ca.create_root_ca(&mut registry).unwrap();

        assert!(ca.root_ready());
        let calls = signer.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ctx.root_request_path());
        assert_eq!(calls[0].1, SignMode::InitializeCa);

        let request = fs::read_to_string(ctx.root_request_path()).unwrap();
        assert!(request.contains("containerlab-wan Root CA"));
        assert_eq!(registry.get("br0").unwrap().tls_anchor, "ROOT");
    }

    #[test]
    fn test_create_cert_passes_root_paths() {
        let temp_dir = TempDir::new().unwrap();
        let (ctx, mut registry) = lab(temp_dir.path());
        let signer = ScriptedSigner::new(vec![
            Ok(br#"{"cert":"ROOT","key":"RK"}"#.to_vec()),
            Ok(br#"{"cert":"LEAF","key":"LK","csr":"LC"}"#.to_vec()),
        ]);
        let mut ca = CertificateAuthority::new(ctx.clone(), &signer);

        ca.create_root_ca(&mut registry).unwrap();
        ca.create_cert(&mut registry, "r1").unwrap();

        let calls = signer.calls.borrow();
        assert_eq!(
            calls[1].1,
            SignMode::SignWithCa {
                ca_cert: ctx.root_cert_path(),
                ca_key: ctx.root_key_path(),
            }
        );
        assert_eq!(
            calls[1].0,
            temp_dir.path().join("ca").join("r1").join("csr-r1.json")
        );

        let r1 = registry.get("r1").unwrap();
        assert_eq!(r1.tls_cert, "LEAF");
        assert_eq!(r1.tls_key, "LK");
        assert_eq!(r1.tls_anchor, "ROOT");
    }

    #[test]
    fn test_create_cert_before_root() {
        let temp_dir = TempDir::new().unwrap();
        let (ctx, mut registry) = lab(temp_dir.path());
        let signer = ScriptedSigner::new(vec![]);
        let ca = CertificateAuthority::new(ctx, &signer);

        let result = ca.create_cert(&mut registry, "r1");

        assert!(matches!(result, Err(LabPkiError::RootCaNotReady)));
        assert!(signer.calls.borrow().is_empty());
        assert!(!temp_dir.path().join("ca").exists());
    }

    #[test]
    fn test_bridge_skipped_before_root() {
        let temp_dir = TempDir::new().unwrap();
        let (ctx, mut registry) = lab(temp_dir.path());
        let signer = ScriptedSigner::new(vec![]);
        let ca = CertificateAuthority::new(ctx, &signer);

        assert!(ca.create_cert(&mut registry, "br0").is_ok());
        assert!(signer.calls.borrow().is_empty());
    }

    #[test]
    fn test_signer_failure_stops_before_distribution() {
        let temp_dir = TempDir::new().unwrap();
        let (ctx, mut registry) = lab(temp_dir.path());
        let signer = ScriptedSigner::new(vec![Err(LabPkiError::SignerUnavailable(
            "exit status: 1".to_string(),
        ))]);
        let mut ca = CertificateAuthority::new(ctx.clone(), &signer);

        let result = ca.create_root_ca(&mut registry);

        assert!(matches!(result, Err(LabPkiError::SignerUnavailable(_))));
        assert!(!ca.root_ready());
        assert!(!ctx.root_cert_path().exists());
        assert!(!ctx.root_key_path().exists());
        assert!(registry.get("r1").unwrap().tls_anchor.is_empty());
    }

    #[test]
    fn test_malformed_root_output_not_ready() {
        let temp_dir = TempDir::new().unwrap();
        let (ctx, mut registry) = lab(temp_dir.path());
        let signer = ScriptedSigner::new(vec![Ok(b"".to_vec())]);
        let mut ca = CertificateAuthority::new(ctx, &signer);

        let result = ca.create_root_ca(&mut registry);

        assert!(matches!(result, Err(LabPkiError::MalformedSignerOutput(_))));
        assert!(!ca.root_ready());
    }

    #[test]
    fn test_failed_root_recreation_blocks_issuance() {
        let temp_dir = TempDir::new().unwrap();
        let (ctx, mut registry) = lab(temp_dir.path());
        let mut ca = CertificateAuthority::new(ctx.clone(), LocalSigner::new());

        ca.create_root_ca(&mut registry).unwrap();
        let anchor = registry.get("r1").unwrap().tls_anchor.clone();

        // The certificate is rewritten but the key write fails.
        fs::remove_file(ctx.root_key_path()).unwrap();
        fs::create_dir(ctx.root_key_path()).unwrap();

        let result = ca.create_root_ca(&mut registry);

        assert!(matches!(result, Err(LabPkiError::FileWriteError { .. })));
        assert!(!ca.root_ready());
        assert_eq!(registry.get("r1").unwrap().tls_anchor, anchor);
        assert!(matches!(
            ca.create_cert(&mut registry, "r1"),
            Err(LabPkiError::RootCaNotReady)
        ));
        assert!(!temp_dir.path().join("ca").join("r1").exists());
    }

    #[test]
    fn test_create_certs_reports_each_node() {
        let temp_dir = TempDir::new().unwrap();
        let (ctx, mut registry) = lab(temp_dir.path());
        registry.insert(Node::new(
            "r2",
            "clab-wan-r2",
            "r2.wan.io",
            "router",
            temp_dir.path().join("ca").join("r2"),
        ));
        let mut ca = CertificateAuthority::new(ctx, LocalSigner::new());

        ca.create_root_ca(&mut registry).unwrap();
        let results = ca.create_certs(&mut registry);

        let names: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["br0", "r1", "r2"]);
        assert!(results.iter().all(|(_, result)| result.is_ok()));
        assert!(registry.get("br0").unwrap().tls_cert.is_empty());
        assert!(!registry.get("r2").unwrap().tls_cert.is_empty());
    }
}
