//! In-process Ed25519 signer.
//!
//! Produces the same `{"cert", "key", "csr"}` response as `cfssl gencert`
//! without an external binary. The CA key is read back from the PKCS#8 file
//! written by the root CA issuance.

use crate::cert::keys::{generate_keypair, keypair_from_pkcs8_pem, keypair_to_pkcs8_pem};
use crate::cert::request::{build_csr_pem, CsrDescriptor};
use crate::cert::x509::{create_self_signed_ca, sign_certificate};
use crate::error::{LabPkiError, Result};
use crate::signer::{SignMode, Signer};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Root CA validity, matching cfssl's 262800h CA expiry.
pub const ROOT_VALIDITY_DAYS: u32 = 10950;

/// Leaf validity, matching cfssl's default 8760h expiry.
pub const LEAF_VALIDITY_DAYS: u32 = 365;

#[derive(Serialize)]
struct Issued {
    cert: String,
    key: String,
    csr: String,
}

/// Signer that issues Ed25519 certificates in-process.
#[derive(Debug, Clone)]
pub struct LocalSigner {
    root_validity_days: u32,
    leaf_validity_days: u32,
}

impl Default for LocalSigner {
    fn default() -> Self {
        Self {
            root_validity_days: ROOT_VALIDITY_DAYS,
            leaf_validity_days: LEAF_VALIDITY_DAYS,
        }
    }
}

impl LocalSigner {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&self, request: &Path, mode: &SignMode) -> Result<Vec<u8>> {
        let descriptor = CsrDescriptor::from_file(request)?;
        let keypair = generate_keypair();
        let csr = build_csr_pem(&keypair, &descriptor)?;

        let cert = match mode {
            SignMode::InitializeCa => create_self_signed_ca(
                &keypair,
                &descriptor.common_name,
                self.root_validity_days,
            )?,
            SignMode::SignWithCa { ca_cert, ca_key } => {
                let ca_cert_pem = fs::read_to_string(ca_cert)?;
                let ca_keypair = keypair_from_pkcs8_pem(&fs::read_to_string(ca_key)?)?;
                sign_certificate(
                    &keypair,
                    &descriptor.common_name,
                    &descriptor.hosts,
                    &ca_keypair,
                    &ca_cert_pem,
                    self.leaf_validity_days,
                )?
            }
        };

        debug!(cn = %descriptor.common_name, "issued certificate in-process");

        let issued = Issued {
            cert,
            key: keypair_to_pkcs8_pem(&keypair),
            csr,
        };
        Ok(serde_json::to_vec(&issued)?)
    }
}

impl Signer for LocalSigner {
    fn sign(&self, request: &Path, mode: &SignMode) -> Result<Vec<u8>> {
        self.issue(request, mode).map_err(|e| match e {
            LabPkiError::SignerUnavailable(_) => e,
            other => LabPkiError::SignerUnavailable(other.to_string()),
        })
    }
}
