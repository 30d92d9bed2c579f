//! Certificate primitives.
//!
//! Ed25519 keys, X.509 issuance and PKCS#10 requests used by the in-process
//! signer, plus chain verification for issued material.

pub mod keys;
pub mod request;
pub mod x509;
