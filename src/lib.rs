//! labpki: private TLS trust for network labs
//!
//! This library bootstraps a root certificate authority for a lab and issues
//! one leaf certificate per node, signed by that root. It enables a lab
//! runner to:
//!
//! - Render CSR descriptors from templates for the root CA and every node
//! - Sign them with an external `cfssl` binary or in-process Ed25519 keys
//! - Persist `.pem`, `-key.pem` and `.csr` artifacts per CA and per node
//! - Hand each node its certificate, key and the shared trust anchor
//!
//! # Architecture
//!
//! [`authority::CertificateAuthority`] sequences every issuance as directory
//! creation, template rendering, signing and distribution. Each step returns
//! a `Result`; nothing in the library exits the process.
//!
//! # Example
//!
//! ```rust,no_run
//! use labpki::authority::CertificateAuthority;
//! use labpki::config::CaContext;
//! use labpki::lab::{Node, NodeRegistry};
//! use labpki::signer::LocalSigner;
//!
//! fn example() -> labpki::error::Result<()> {
//!     let mut registry = NodeRegistry::new();
//!     registry.insert(Node::new("r1", "clab-wan-r1", "r1.wan.io", "router", "lab/ca/r1"));
//!
//!     let mut ca = CertificateAuthority::new(CaContext::new("lab/ca/root", "wan"), LocalSigner::new());
//!     ca.create_root_ca(&mut registry)?;
//!     ca.create_cert(&mut registry, "r1")?;
//!     Ok(())
//! }
//! ```

pub mod authority;
pub mod cert;
pub mod config;
pub mod distribute;
pub mod error;
pub mod lab;
pub mod signer;
pub mod storage;
pub mod template;

// Re-export commonly used types
pub use error::{LabPkiError, Result};
