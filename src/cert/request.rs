//! CSR descriptors and PKCS#10 requests.
//!
//! A descriptor is the JSON document rendered from a CSR template. Only the
//! `CN` and `hosts` members matter to the in-process signer; key algorithm
//! and naming members are left to external signers.

use crate::cert::keys::{keypair_to_rcgen, Keypair};
use crate::error::{LabPkiError, Result};
use rcgen::{Certificate, CertificateParams, DistinguishedName, DnType, SanType};
use serde::Deserialize;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

/// The parts of a CSR descriptor needed to issue a certificate.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CsrDescriptor {
    #[serde(rename = "CN")]
    pub common_name: String,

    #[serde(default)]
    pub hosts: Vec<String>,
}

impl CsrDescriptor {
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptor: CsrDescriptor = serde_json::from_str(json)?;
        if descriptor.common_name.trim().is_empty() {
            return Err(LabPkiError::CertificateError(
                "CSR descriptor has an empty CN".to_string(),
            ));
        }
        Ok(descriptor)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Build a PEM PKCS#10 request for `descriptor`, signed by `keypair`.
pub fn build_csr_pem(keypair: &Keypair, descriptor: &CsrDescriptor) -> Result<String> {
    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::CommonName, descriptor.common_name.as_str());

    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name;
    params.subject_alt_names = descriptor
        .hosts
        .iter()
        .map(|host| match host.parse::<IpAddr>() {
            Ok(ip) => SanType::IpAddress(ip),
            Err(_) => SanType::DnsName(host.clone()),
        })
        .collect();
    params.alg = &rcgen::PKCS_ED25519;
    params.key_pair = Some(keypair_to_rcgen(keypair)?);

    let cert = Certificate::from_params(params)
        .map_err(|e| LabPkiError::CertificateError(format!("Failed to build CSR: {}", e)))?;

    cert.serialize_request_pem()
        .map_err(|e| LabPkiError::CertificateError(format!("Failed to encode CSR: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::keys::generate_keypair;

    #[test]
    fn test_descriptor_from_json() {
        let descriptor = CsrDescriptor::from_json(
            r#"{"CN":"r1.wan.io","key":{"algo":"ecdsa","size":256},"hosts":["r1","10.0.0.1"]}"#,
        )
        .unwrap();

        assert_eq!(descriptor.common_name, "r1.wan.io");
        assert_eq!(descriptor.hosts, vec!["r1", "10.0.0.1"]);
    }

    #[test]
    fn test_descriptor_without_hosts() {
        let descriptor = CsrDescriptor::from_json(r#"{"CN":"Root CA"}"#).unwrap();
        assert!(descriptor.hosts.is_empty());
    }

    #[test]
    fn test_descriptor_missing_cn() {
        assert!(CsrDescriptor::from_json(r#"{"hosts":[]}"#).is_err());
        assert!(CsrDescriptor::from_json(r#"{"CN":"  "}"#).is_err());
    }

    #[test]
    fn test_build_csr_pem() {
        let descriptor = CsrDescriptor {
            common_name: "r1.wan.io".to_string(),
            hosts: vec!["r1".to_string(), "192.0.2.1".to_string()],
        };

        let pem = build_csr_pem(&generate_keypair(), &descriptor).unwrap();

        assert!(pem.contains("BEGIN CERTIFICATE REQUEST"));
        assert!(pem.contains("END CERTIFICATE REQUEST"));
    }
}
