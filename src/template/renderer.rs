//! Template rendering into request files.
//!
//! Every value is emitted as a JSON literal, quotes included, so templates
//! write `"CN": {{ fqdn }}` rather than `"CN": "{{ fqdn }}"`. Concatenate
//! with `~` to build a composite string.

use crate::config::CaContext;
use crate::error::{LabPkiError, Result};
use crate::storage::fs::create_file;
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Built-in root CA request descriptor.
pub const DEFAULT_ROOT_TEMPLATE: &str = include_str!("../../templates/csr-root-ca.json");

/// Built-in node request descriptor.
pub const DEFAULT_NODE_TEMPLATE: &str = include_str!("../../templates/csr.json");

/// Where a template's text comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    Embedded(&'static str),
    File(PathBuf),
}

impl TemplateSource {
    fn load(&self) -> Result<Cow<'static, str>> {
        match self {
            TemplateSource::Embedded(text) => Ok(Cow::Borrowed(*text)),
            TemplateSource::File(path) => fs::read_to_string(path).map(Cow::Owned).map_err(|e| {
                LabPkiError::TemplateError(format!(
                    "Failed to read template {}: {}",
                    path.display(),
                    e
                ))
            }),
        }
    }

    fn describe(&self) -> String {
        match self {
            TemplateSource::Embedded(_) => "<embedded>".to_string(),
            TemplateSource::File(path) => path.display().to_string(),
        }
    }
}

/// Values available to the root CA template.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RootCsrParams {
    pub prefix: String,
}

/// Values available to the node template.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeCsrParams {
    pub name: String,
    pub long_name: String,
    pub fqdn: String,
    pub prefix: String,
}

/// Render `source` with `params` and write the result to `destination`.
///
/// The template is rendered in memory first, so a rendering failure leaves
/// `destination` untouched. Output that is not a JSON document is rejected.
///
/// # Example
///
/// ```rust,no_run
/// use labpki::template::{RootCsrParams, TemplateSource};
/// use labpki::template::renderer::render;
/// use std::path::Path;
///
/// # fn example() -> labpki::error::Result<()> {
/// let params = RootCsrParams { prefix: "containerlab-wan".to_string() };
/// render(
///     &TemplateSource::Embedded("{\"CN\": {{ prefix ~ \" Root CA\" }}}"),
///     &params,
///     Path::new("csr-root-ca.json"),
/// )?;
/// # Ok(())
/// # }
/// ```
pub fn render<P: Serialize>(source: &TemplateSource, params: &P, destination: &Path) -> Result<()> {
    let template = source.load()?;

    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env.set_auto_escape_callback(|_| AutoEscape::Json);

    let rendered = env.render_str(&template, params).map_err(|e| {
        LabPkiError::TemplateError(format!(
            "Failed to render template {}: {}",
            source.describe(),
            e
        ))
    })?;

    serde_json::from_str::<serde_json::Value>(&rendered).map_err(|e| {
        LabPkiError::TemplateError(format!(
            "Template {} did not render to JSON: {}",
            source.describe(),
            e
        ))
    })?;

    create_file(destination, rendered)?;
    debug!(
        src = %source.describe(),
        dst = %destination.display(),
        "rendered CSR template"
    );

    Ok(())
}

/// Renders the root and node request descriptors of one lab.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    root: TemplateSource,
    node: TemplateSource,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self {
            root: TemplateSource::Embedded(DEFAULT_ROOT_TEMPLATE),
            node: TemplateSource::Embedded(DEFAULT_NODE_TEMPLATE),
        }
    }
}

impl TemplateRenderer {
    pub fn new(root: TemplateSource, node: TemplateSource) -> Self {
        Self { root, node }
    }

    /// Use the context's override files, falling back to the built-in templates.
    pub fn from_context(ctx: &CaContext) -> Self {
        let defaults = Self::default();
        Self {
            root: ctx
                .root_template
                .clone()
                .map(TemplateSource::File)
                .unwrap_or(defaults.root),
            node: ctx
                .node_template
                .clone()
                .map(TemplateSource::File)
                .unwrap_or(defaults.node),
        }
    }

    pub fn render_root(&self, params: &RootCsrParams, destination: &Path) -> Result<()> {
        render(&self.root, params, destination)
    }

    pub fn render_node(&self, params: &NodeCsrParams, destination: &Path) -> Result<()> {
        render(&self.node, params, destination)
    }
}
