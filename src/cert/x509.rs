//! X.509 issuance and verification using x509-cert.
//!
//! Certificates are Ed25519-signed. A root is self-signed with
//! `basicConstraints CA:TRUE`; a leaf carries `CA:FALSE` and the request's
//! hosts as subject alternative names.

use crate::cert::keys::{encode_pem, Keypair};
use crate::error::{LabPkiError, Result};
use der::asn1::{BitString, Ia5String, OctetString, Utf8StringRef};
use der::{Decode, Encode};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use std::net::IpAddr;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::certificate::Certificate;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{BasicConstraints, SubjectAltName};
use x509_cert::ext::Extension;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Validity;
use x509_cert::TbsCertificate;

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Create a self-signed root CA certificate and return it as PEM.
///
/// # Example
///
/// ```
/// use labpki::cert::keys::generate_keypair;
/// use labpki::cert::x509::create_self_signed_ca;
///
/// # fn example() -> labpki::error::Result<()> {
/// let keypair = generate_keypair();
/// let cert_pem = create_self_signed_ca(&keypair, "wan Root CA", 3650)?;
/// assert!(cert_pem.contains("BEGIN CERTIFICATE"));
/// # Ok(())
/// # }
/// ```
pub fn create_self_signed_ca(
    keypair: &Keypair,
    subject_cn: &str,
    validity_days: u32,
) -> Result<String> {
    let subject = create_rdn_sequence(subject_cn)?;
    let issuer = subject.clone();

    let tbs = build_tbs(
        issuer,
        subject,
        &keypair.public,
        validity_days,
        vec![basic_constraints(true)?],
    )?;

    let cert = sign_tbs(tbs, &keypair.secret)?;
    cert_to_pem(&cert)
}

/// Issue a leaf certificate for `subject_keypair`, signed by a CA.
///
/// `hosts` become subject alternative names; entries that parse as IP
/// addresses are added as IP names, the rest as DNS names.
pub fn sign_certificate(
    subject_keypair: &Keypair,
    subject_cn: &str,
    hosts: &[String],
    ca_keypair: &Keypair,
    ca_cert_pem: &str,
    validity_days: u32,
) -> Result<String> {
    let ca_cert = cert_from_pem(ca_cert_pem)?;
    if ca_public_key(&ca_cert)? != ca_keypair.public {
        return Err(LabPkiError::CertificateError(
            "CA key does not match CA certificate".to_string(),
        ));
    }

    let mut extensions = vec![basic_constraints(false)?];
    if !hosts.is_empty() {
        extensions.push(subject_alt_names(hosts)?);
    }

    let tbs = build_tbs(
        ca_cert.tbs_certificate.subject.clone(),
        create_rdn_sequence(subject_cn)?,
        &subject_keypair.public,
        validity_days,
        extensions,
    )?;

    let cert = sign_tbs(tbs, &ca_keypair.secret)?;
    cert_to_pem(&cert)
}

/// Check that `cert_pem` was issued and signed by `issuer_pem`.
pub fn verify_issued_by(cert_pem: &str, issuer_pem: &str) -> Result<()> {
    let cert = cert_from_pem(cert_pem)?;
    let issuer = cert_from_pem(issuer_pem)?;

    if cert.tbs_certificate.issuer != issuer.tbs_certificate.subject {
        return Err(LabPkiError::CertificateError(
            "Certificate issuer does not match CA subject".to_string(),
        ));
    }

    let verifying_key = ca_public_key(&issuer)?;
    let signature = Signature::from_slice(cert.signature.raw_bytes())
        .map_err(|e| LabPkiError::CertificateError(format!("Invalid signature: {}", e)))?;
    let tbs_der = cert
        .tbs_certificate
        .to_der()
        .map_err(|e| LabPkiError::CertificateError(format!("Failed to encode TBS: {}", e)))?;

    verifying_key.verify(&tbs_der, &signature).map_err(|e| {
        LabPkiError::CertificateError(format!("Signature verification failed: {}", e))
    })
}

/// Convert a Certificate to PEM format.
pub fn cert_to_pem(cert: &Certificate) -> Result<String> {
    let der = cert.to_der().map_err(|e| {
        LabPkiError::CertificateError(format!("Failed to encode certificate: {}", e))
    })?;

    Ok(encode_pem(CERTIFICATE_TAG, der))
}

/// Load a Certificate from PEM format.
pub fn cert_from_pem(pem_str: &str) -> Result<Certificate> {
    let pem = pem::parse(pem_str)
        .map_err(|e| LabPkiError::PemError(format!("Failed to parse PEM: {}", e)))?;

    if pem.tag() != CERTIFICATE_TAG {
        return Err(LabPkiError::PemError(format!(
            "Expected {}, got {}",
            CERTIFICATE_TAG,
            pem.tag()
        )));
    }

    Certificate::from_der(pem.contents()).map_err(|e| {
        LabPkiError::CertificateError(format!("Failed to decode certificate: {}", e))
    })
}

// Helper functions

fn build_tbs(
    issuer: RdnSequence,
    subject: RdnSequence,
    public_key: &VerifyingKey,
    validity_days: u32,
    extensions: Vec<Extension>,
) -> Result<TbsCertificate> {
    Ok(TbsCertificate {
        version: x509_cert::certificate::Version::V3,
        serial_number: generate_serial_number()?,
        signature: ed25519_algorithm(),
        issuer,
        validity: create_validity(validity_days)?,
        subject,
        subject_public_key_info: create_subject_public_key_info(public_key)?,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(extensions),
    })
}

fn sign_tbs(tbs: TbsCertificate, signing_key: &SigningKey) -> Result<Certificate> {
    let tbs_der = tbs
        .to_der()
        .map_err(|e| LabPkiError::CertificateError(format!("Failed to encode TBS: {}", e)))?;

    let signature = BitString::from_bytes(&signing_key.sign(&tbs_der).to_bytes()).map_err(|e| {
        LabPkiError::CertificateError(format!("Failed to create signature bitstring: {}", e))
    })?;

    Ok(Certificate {
        tbs_certificate: tbs,
        signature_algorithm: ed25519_algorithm(),
        signature,
    })
}

fn ca_public_key(cert: &Certificate) -> Result<VerifyingKey> {
    let spki = &cert.tbs_certificate.subject_public_key_info;
    if spki.algorithm.oid != const_oid::db::rfc8410::ID_ED_25519 {
        return Err(LabPkiError::CertificateError(format!(
            "Unsupported CA key algorithm: {}",
            spki.algorithm.oid
        )));
    }

    let bytes = <[u8; 32]>::try_from(spki.subject_public_key.raw_bytes())
        .map_err(|_| LabPkiError::CertificateError("Invalid Ed25519 public key".to_string()))?;

    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| LabPkiError::CertificateError(format!("Invalid Ed25519 public key: {}", e)))
}

fn generate_serial_number() -> Result<SerialNumber> {
    let mut bytes = [0u8; 20];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    bytes[0] &= 0x7F; // Ensure positive

    SerialNumber::new(&bytes).map_err(|e| {
        LabPkiError::CertificateError(format!("Failed to create serial number: {}", e))
    })
}

fn create_rdn_sequence(cn: &str) -> Result<RdnSequence> {
    let cn_attr = AttributeTypeAndValue {
        oid: const_oid::db::rfc4519::CN,
        value: Utf8StringRef::new(cn)
            .map_err(|e| LabPkiError::CertificateError(format!("Invalid CN: {}", e)))?
            .into(),
    };

    let mut attr_set = der::asn1::SetOfVec::new();
    attr_set
        .insert_ordered(cn_attr)
        .map_err(|e| LabPkiError::CertificateError(format!("Failed to add attribute: {}", e)))?;

    Ok(RdnSequence(vec![RelativeDistinguishedName::from(attr_set)]))
}

fn create_validity(days: u32) -> Result<Validity> {
    Validity::from_now(std::time::Duration::from_secs(days as u64 * 86400))
        .map_err(|e| LabPkiError::CertificateError(format!("Failed to create validity: {}", e)))
}

fn create_subject_public_key_info(public_key: &VerifyingKey) -> Result<SubjectPublicKeyInfoOwned> {
    let subject_public_key = BitString::from_bytes(&public_key.to_bytes()).map_err(|e| {
        LabPkiError::CertificateError(format!("Failed to create bit string: {}", e))
    })?;

    Ok(SubjectPublicKeyInfoOwned {
        algorithm: ed25519_algorithm(),
        subject_public_key,
    })
}

fn ed25519_algorithm() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: const_oid::db::rfc8410::ID_ED_25519,
        parameters: None,
    }
}

fn extension(oid: const_oid::ObjectIdentifier, critical: bool, value: Vec<u8>) -> Result<Extension> {
    Ok(Extension {
        extn_id: oid,
        critical,
        extn_value: OctetString::new(value).map_err(|e| {
            LabPkiError::CertificateError(format!("Failed to encode extension: {}", e))
        })?,
    })
}

fn basic_constraints(ca: bool) -> Result<Extension> {
    let value = BasicConstraints {
        ca,
        path_len_constraint: None,
    }
    .to_der()
    .map_err(|e| LabPkiError::CertificateError(format!("Failed to encode extension: {}", e)))?;

    extension(const_oid::db::rfc5280::ID_CE_BASIC_CONSTRAINTS, true, value)
}

fn subject_alt_names(hosts: &[String]) -> Result<Extension> {
    let names = hosts
        .iter()
        .map(|host| match host.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => OctetString::new(ip.octets().to_vec()).map(GeneralName::IpAddress),
            Ok(IpAddr::V6(ip)) => OctetString::new(ip.octets().to_vec()).map(GeneralName::IpAddress),
            Err(_) => Ia5String::new(host).map(GeneralName::DnsName),
        })
        .collect::<der::Result<Vec<GeneralName>>>()
        .map_err(|e| LabPkiError::CertificateError(format!("Invalid host name: {}", e)))?;

    let value = SubjectAltName(names)
        .to_der()
        .map_err(|e| LabPkiError::CertificateError(format!("Failed to encode extension: {}", e)))?;

    extension(const_oid::db::rfc5280::ID_CE_SUBJECT_ALT_NAME, false, value)
}
