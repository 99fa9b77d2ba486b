//! Element behaviour attached to tree nodes.

use super::NodeRef;

/// Behaviour hooks for a node, invoked by the tree substrate.
///
/// `connected` and `disconnected` alternate strictly for a given node:
/// each fires at most once per attach/detach cycle and `connected` always
/// comes first. Hooks run with no tree lock held, so they may freely read
/// and mutate the tree.
pub trait Element: Send + Sync {
    /// Attribute names whose changes are reported to
    /// [`attribute_changed`](Element::attribute_changed).
    fn observed_attributes(&self) -> &'static [&'static str] {
        &[]
    }

    /// The node became part of the live tree.
    fn connected(&self, _node: &NodeRef) {}

    /// The node was removed from the live tree.
    fn disconnected(&self, _node: &NodeRef) {}

    /// An observed attribute changed value. `None` means absent.
    fn attribute_changed(
        &self,
        _node: &NodeRef,
        _name: &str,
        _old: Option<&str>,
        _new: Option<&str>,
    ) {
    }
}
