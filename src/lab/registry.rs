//! Node registry.

use crate::lab::node::Node;
use std::collections::HashMap;

/// All nodes of a lab, keyed by short name.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, Node>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, replacing any node with the same short name.
    pub fn insert(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.name.clone(), node)
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Short names sorted for stable iteration.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Nodes sorted by short name.
    pub fn nodes(&self) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }

    /// Set the trust anchor of every node currently in the registry.
    pub fn broadcast_trust_anchor(&mut self, anchor: &str) {
        for node in self.nodes.values_mut() {
            node.tls_anchor = anchor.to_string();
        }
    }
}

impl FromIterator<Node> for NodeRegistry {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        let mut registry = Self::new();
        for node in iter {
            registry.insert(node);
        }
        registry
    }
}
