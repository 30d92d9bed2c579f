//! Certificate signers.
//!
//! A [`Signer`] turns a rendered CSR descriptor into a JSON response carrying
//! `cert`, `key` and `csr` fields. Signers never write files themselves.

pub mod cfssl;
pub mod local;
pub mod response;

pub use cfssl::CfsslSigner;
pub use local::LocalSigner;
pub use response::SignerResponse;

use crate::error::Result;
use std::path::{Path, PathBuf};

/// What the signer is asked to do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignMode {
    /// Produce a self-signed root CA.
    InitializeCa,
    /// Produce a leaf certificate signed by the given CA.
    SignWithCa { ca_cert: PathBuf, ca_key: PathBuf },
}

/// Issues certificates from CSR descriptor files.
pub trait Signer {
    /// Sign the request at `request` and return the raw response bytes.
    ///
    /// Any failure is reported as [`crate::error::LabPkiError::SignerUnavailable`];
    /// callers must not look at output after an error.
    fn sign(&self, request: &Path, mode: &SignMode) -> Result<Vec<u8>>;
}

impl<S: Signer + ?Sized> Signer for &S {
    fn sign(&self, request: &Path, mode: &SignMode) -> Result<Vec<u8>> {
        (**self).sign(request, mode)
    }
}

impl<S: Signer + ?Sized> Signer for Box<S> {
    fn sign(&self, request: &Path, mode: &SignMode) -> Result<Vec<u8>> {
        (**self).sign(request, mode)
    }
}
