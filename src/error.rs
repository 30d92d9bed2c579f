//! Error types for the labpki library.
//!
//! Every issuance step returns one of these variants to its caller. None of
//! them terminate the process; only the CLI decides the exit code.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for labpki operations.
#[derive(Error, Debug)]
pub enum LabPkiError {
    /// Issuance was requested for a name absent from the registry
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// CSR template missing, malformed, or referencing an undefined value
    #[error("Template error: {0}")]
    TemplateError(String),

    /// The signer could not be run, exited non-zero, or timed out
    #[error("Signer unavailable: {0}")]
    SignerUnavailable(String),

    /// Signer output is not a JSON object of string fields
    #[error("Malformed signer output: {0}")]
    MalformedSignerOutput(String),

    /// A directory or artifact file could not be written
    #[error("Failed to write {}: {source}", path.display())]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Node issuance attempted before the root CA was created
    #[error("Root CA has not been created for this lab")]
    RootCaNotReady,

    /// Invalid lab description or CLI configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Certificate generation or validation error
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// PEM encoding/decoding error
    #[error("PEM error: {0}")]
    PemError(String),

    /// Storage I/O error
    #[error("Storage I/O error: {0}")]
    StorageError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for labpki operations.
pub type Result<T> = std::result::Result<T, LabPkiError>;
