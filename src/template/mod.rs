//! CSR descriptor templates.
//!
//! The root and node request descriptors are `minijinja` templates rendered
//! into JSON files that the signer consumes.

pub mod renderer;

pub use renderer::{NodeCsrParams, RootCsrParams, TemplateRenderer, TemplateSource};
