//! Node identifiers and handles.

use std::fmt;

use super::Tree;
use crate::error::TreeResult;

/// Identifier of a node within one [`Tree`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// The permanent root node of every tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Returns the raw numeric id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// A node together with the tree it lives in.
///
/// This is what [`Element`](super::Element) hooks receive. It is cheap to clone
/// and does not keep the node alive; operations on a removed node report
/// [`TreeError::NodeNotFound`](crate::TreeError::NodeNotFound) or return `None`.
#[derive(Clone)]
pub struct NodeRef {
    tree: Tree,
    id: NodeId,
}

impl NodeRef {
    pub(crate) fn new(tree: Tree, id: NodeId) -> Self {
        Self { tree, id }
    }

    /// Returns the node's id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the owning tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Returns the node's tag.
    pub fn tag(&self) -> Option<String> {
        self.tree.tag(self.id)
    }

    /// Returns the parent node, if attached.
    pub fn parent(&self) -> Option<NodeRef> {
        self.tree.parent(self.id).map(|p| self.tree.node(p))
    }

    /// Returns `true` while the node is part of the live tree.
    pub fn is_connected(&self) -> bool {
        self.tree.is_connected(self.id)
    }

    /// Reads an attribute.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.tree.get_attribute(self.id, name)
    }

    /// Writes an attribute, notifying the node's element if it observes `name`.
    pub fn set_attribute(&self, name: &str, value: impl Into<String>) -> TreeResult<()> {
        self.tree.set_attribute(self.id, name, value)
    }

    /// Removes an attribute, notifying the node's element if it observes `name`.
    pub fn remove_attribute(&self, name: &str) -> TreeResult<()> {
        self.tree.remove_attribute(self.id, name)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("tag", &self.tag())
            .finish()
    }
}
