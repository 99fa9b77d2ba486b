//! Error types for the Arbor core.
//!
//! Only the tree substrate reports errors. The context channel resolves every
//! failure mode by absence of effect (see [`crate::context`]).

use thiserror::Error;

use crate::tree::NodeId;

/// Structural faults raised by [`Tree`](crate::tree::Tree) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The node does not exist in this tree.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// Appending would make a node its own ancestor.
    #[error("cannot append {child} beneath its descendant {parent}")]
    CycleDetected {
        /// The requested parent.
        parent: NodeId,
        /// The node being appended.
        child: NodeId,
    },

    /// A node was appended to itself.
    #[error("cannot append {0} to itself")]
    SelfAppend(NodeId),

    /// The root node is permanent.
    #[error("the root node cannot be removed or re-parented")]
    CannotRemoveRoot,

    /// The resulting subtree would be deeper than the configured limit.
    #[error("tree depth {depth} exceeds the limit of {max}")]
    DepthExceeded {
        /// Depth the deepest node would reach.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
