//! Lab filesystem storage.
//!
//! This module provides the directory and artifact-file primitives every
//! issuance step writes through.

pub mod fs;
