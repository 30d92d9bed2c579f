//! Lab topology model.
//!
//! Nodes, the registry that holds them, and the JSON lab description the CLI
//! loads them from.

pub mod description;
pub mod node;
pub mod registry;

pub use description::LabDescription;
pub use node::Node;
pub use registry::NodeRegistry;
