//! In-process tree substrate.
//!
//! [`Tree`] is a small node hierarchy that provides exactly what the context
//! channel needs from its host:
//!
//! - **Bubbling dispatch**: [`Tree::dispatch`] sends a [`TreeEvent`] from a
//!   node toward the root. The propagation path is fixed when dispatch starts;
//!   any listener may halt it.
//! - **Lifecycle notifications**: nodes carrying an [`Element`] are told when
//!   they join (`connected`) and leave (`disconnected`) the live tree, i.e. the
//!   subtree under the permanent root.
//! - **Observed attributes**: string attributes whose changes are reported to
//!   the node's element.
//!
//! ```text
//! root (#0, always connected)
//! └── provider (#1)        ← listener for "context-request"
//!     └── div (#2)
//!         └── consumer (#3) ── dispatch ──▶ #3 → #2 → #1 (stopped)
//! ```
//!
//! # Locking
//!
//! Node storage sits behind a single `RwLock`. It is never held while a
//! listener or element hook runs, so those callbacks may re-enter the tree.

mod element;
mod event;
mod node;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{Level, debug, span, trace};

use crate::error::{TreeError, TreeResult};

pub use element::Element;
pub use event::{Listener, ListenerId, TreeEvent};
pub use node::{NodeId, NodeRef};

use event::ListenerEntry;

/// Tunables for a [`Tree`].
#[derive(Debug, Clone)]
pub struct TreeOptions {
    /// Maximum number of edges between the root and any node.
    pub max_depth: usize,
    /// Log context requests that reach the root without being served.
    pub log_unhandled_requests: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: 512,
            log_unhandled_requests: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Connected,
    Disconnected,
}

struct NodeData {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Structural state: reachable from the root.
    connected: bool,
    /// Last lifecycle hook delivered was `connected`.
    notified: bool,
    attributes: BTreeMap<String, String>,
    listeners: Vec<ListenerEntry>,
    element: Option<Arc<dyn Element>>,
}

impl NodeData {
    fn new(tag: String, element: Option<Arc<dyn Element>>) -> Self {
        Self {
            tag,
            parent: None,
            children: Vec::new(),
            connected: false,
            notified: false,
            attributes: BTreeMap::new(),
            listeners: Vec::new(),
            element,
        }
    }
}

struct TreeInner {
    nodes: HashMap<NodeId, NodeData>,
    next_node: u64,
    next_listener: u64,
}

impl TreeInner {
    fn get(&self, id: NodeId) -> TreeResult<&NodeData> {
        self.nodes.get(&id).ok_or(TreeError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> TreeResult<&mut NodeData> {
        self.nodes.get_mut(&id).ok_or(TreeError::NodeNotFound(id))
    }

    /// Ancestors of `id`, nearest first.
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(parent) = cursor {
            out.push(parent);
            cursor = self.nodes.get(&parent).and_then(|n| n.parent);
        }
        out
    }

    /// Pre-order walk of the subtree rooted at `id`.
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                out.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Number of edges on the longest downward path from `id`.
    fn height(&self, id: NodeId) -> usize {
        self.nodes
            .get(&id)
            .map(|n| {
                n.children
                    .iter()
                    .map(|c| self.height(*c) + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    fn check_append(&self, parent: NodeId, child: NodeId, max_depth: usize) -> TreeResult<()> {
        if child == NodeId::ROOT {
            return Err(TreeError::CannotRemoveRoot);
        }
        if parent == child {
            return Err(TreeError::SelfAppend(child));
        }
        self.get(parent)?;
        self.get(child)?;

        let parent_ancestors = self.ancestors(parent);
        if parent_ancestors.contains(&child) {
            return Err(TreeError::CycleDetected { parent, child });
        }

        let depth = parent_ancestors.len() + 1 + self.height(child);
        if depth > max_depth {
            return Err(TreeError::DepthExceeded {
                depth,
                max: max_depth,
            });
        }
        Ok(())
    }

    /// Unlinks `id` from its parent and returns the lifecycle transitions owed.
    fn detach(&mut self, id: NodeId) -> TreeResult<Vec<(NodeId, Lifecycle)>> {
        let node = self.get_mut(id)?;
        let Some(parent) = node.parent.take() else {
            return Ok(Vec::new());
        };
        let was_connected = node.connected;

        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|c| *c != id);
        }

        if !was_connected {
            return Ok(Vec::new());
        }
        let subtree = self.subtree(id);
        for member in &subtree {
            if let Some(node) = self.nodes.get_mut(member) {
                node.connected = false;
            }
        }
        Ok(subtree
            .into_iter()
            .map(|n| (n, Lifecycle::Disconnected))
            .collect())
    }
}

/// Shared handle to a node hierarchy.
///
/// Cloning is cheap; all clones observe the same nodes.
#[derive(Clone)]
pub struct Tree {
    inner: Arc<RwLock<TreeInner>>,
    options: Arc<TreeOptions>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Creates a tree containing only the connected root node.
    pub fn new() -> Self {
        Self::with_options(TreeOptions::default())
    }

    /// Creates a tree with custom options.
    pub fn with_options(options: TreeOptions) -> Self {
        let mut root = NodeData::new("#root".to_string(), None);
        root.connected = true;
        root.notified = true;

        let mut nodes = HashMap::new();
        nodes.insert(NodeId::ROOT, root);

        Self {
            inner: Arc::new(RwLock::new(TreeInner {
                nodes,
                next_node: 1,
                next_listener: 1,
            })),
            options: Arc::new(options),
        }
    }

    /// Returns this tree's options.
    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Returns a handle to the root node.
    pub fn root(&self) -> NodeRef {
        self.node(NodeId::ROOT)
    }

    /// Returns a handle to `id`. The node is not required to exist.
    pub fn node(&self, id: NodeId) -> NodeRef {
        NodeRef::new(self.clone(), id)
    }

    /// Returns `true` if `id` exists in this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.read().nodes.contains_key(&id)
    }

    /// Returns the number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Always `false`: the root cannot be removed.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Creates a detached node with no element.
    pub fn create_node(&self, tag: impl Into<String>) -> NodeId {
        self.insert_node(tag.into(), None)
    }

    /// Creates a detached node driven by `element`.
    pub fn create_element(&self, tag: impl Into<String>, element: Arc<dyn Element>) -> NodeId {
        self.insert_node(tag.into(), Some(element))
    }

    fn insert_node(&self, tag: String, element: Option<Arc<dyn Element>>) -> NodeId {
        let mut inner = self.inner.write();
        let id = NodeId(inner.next_node);
        inner.next_node += 1;
        trace!(node = %id, tag = %tag, "Created node");
        inner.nodes.insert(id, NodeData::new(tag, element));
        id
    }

    /// Returns the node's tag.
    pub fn tag(&self, id: NodeId) -> Option<String> {
        self.inner.read().nodes.get(&id).map(|n| n.tag.clone())
    }

    /// Returns the node's parent.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner.read().nodes.get(&id).and_then(|n| n.parent)
    }

    /// Returns the node's children in order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.inner
            .read()
            .nodes
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Returns the node's ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.read().ancestors(id)
    }

    /// Returns `true` while the node is reachable from the root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.inner
            .read()
            .nodes
            .get(&id)
            .is_some_and(|n| n.connected)
    }

    /// Appends `child` as the last child of `parent`.
    ///
    /// A child that already has a parent is removed from it first, delivering
    /// `disconnected` hooks before the `connected` hooks of the new position.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        let max_depth = self.options.max_depth;
        self.inner.read().check_append(parent, child, max_depth)?;

        if self.parent(child).is_some() {
            self.remove(child)?;
        }

        let events = {
            let mut inner = self.inner.write();
            // Hooks run by the removal above may have changed the tree.
            inner.check_append(parent, child, max_depth)?;
            let mut events = inner.detach(child)?;

            let parent_connected = {
                let parent_node = inner.get_mut(parent)?;
                parent_node.children.push(child);
                parent_node.connected
            };
            inner.get_mut(child)?.parent = Some(parent);

            if parent_connected {
                for member in inner.subtree(child) {
                    if let Some(node) = inner.nodes.get_mut(&member) {
                        node.connected = true;
                    }
                    events.push((member, Lifecycle::Connected));
                }
            }
            events
        };

        debug!(parent = %parent, child = %child, "Appended node");
        self.notify(events);
        Ok(())
    }

    /// Detaches `id` from its parent. Detached nodes stay valid and may be
    /// appended again. Removing an already detached node does nothing.
    pub fn remove(&self, id: NodeId) -> TreeResult<()> {
        if id == NodeId::ROOT {
            return Err(TreeError::CannotRemoveRoot);
        }
        let events = self.inner.write().detach(id)?;
        debug!(node = %id, "Removed node");
        self.notify(events);
        Ok(())
    }

    /// Removes `id` and frees it together with its whole subtree.
    pub fn destroy(&self, id: NodeId) -> TreeResult<()> {
        self.remove(id)?;
        let mut inner = self.inner.write();
        let subtree = inner.subtree(id);
        for member in &subtree {
            inner.nodes.remove(member);
        }
        debug!(node = %id, freed = subtree.len(), "Destroyed subtree");
        Ok(())
    }

    /// Delivers lifecycle hooks, skipping any that became stale while earlier
    /// hooks ran.
    fn notify(&self, events: Vec<(NodeId, Lifecycle)>) {
        for (id, kind) in events {
            let element = {
                let mut inner = self.inner.write();
                let Some(node) = inner.nodes.get_mut(&id) else {
                    continue;
                };
                let due = match kind {
                    Lifecycle::Connected => node.connected && !node.notified,
                    Lifecycle::Disconnected => !node.connected && node.notified,
                };
                if !due {
                    continue;
                }
                node.notified = kind == Lifecycle::Connected;
                node.element.clone()
            };

            let Some(element) = element else {
                continue;
            };
            let node = self.node(id);
            match kind {
                Lifecycle::Connected => element.connected(&node),
                Lifecycle::Disconnected => element.disconnected(&node),
            }
        }
    }

    // ─── Attributes ───────────────────────────────────────────────────────────

    /// Reads an attribute.
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.inner
            .read()
            .nodes
            .get(&id)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    /// Writes an attribute.
    pub fn set_attribute(
        &self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> TreeResult<()> {
        let value = value.into();
        let (old, element) = {
            let mut inner = self.inner.write();
            let node = inner.get_mut(id)?;
            let old = node.attributes.insert(name.to_string(), value.clone());
            (old, node.element.clone())
        };
        self.attribute_changed(id, element, name, old.as_deref(), Some(&value));
        Ok(())
    }

    /// Removes an attribute.
    pub fn remove_attribute(&self, id: NodeId, name: &str) -> TreeResult<()> {
        let (old, element) = {
            let mut inner = self.inner.write();
            let node = inner.get_mut(id)?;
            (node.attributes.remove(name), node.element.clone())
        };
        self.attribute_changed(id, element, name, old.as_deref(), None);
        Ok(())
    }

    fn attribute_changed(
        &self,
        id: NodeId,
        element: Option<Arc<dyn Element>>,
        name: &str,
        old: Option<&str>,
        new: Option<&str>,
    ) {
        if old == new {
            return;
        }
        if let Some(element) = element
            && element.observed_attributes().contains(&name)
        {
            element.attribute_changed(&self.node(id), name, old, new);
        }
    }

    // ─── Listeners & dispatch ─────────────────────────────────────────────────

    /// Registers `handler` for events named `event_name` dispatched from `id`
    /// or any of its descendants.
    pub fn add_listener<F>(
        &self,
        id: NodeId,
        event_name: &'static str,
        handler: F,
    ) -> TreeResult<ListenerId>
    where
        F: Fn(&mut dyn TreeEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.write();
        let listener_id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.get_mut(id)?.listeners.push(ListenerEntry {
            id: listener_id,
            event_name,
            handler: Arc::new(handler),
        });
        trace!(node = %id, event_name, "Added listener");
        Ok(listener_id)
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: NodeId, listener: ListenerId) -> bool {
        let mut inner = self.inner.write();
        let Some(node) = inner.nodes.get_mut(&id) else {
            return false;
        };
        let before = node.listeners.len();
        node.listeners.retain(|l| l.id != listener);
        before != node.listeners.len()
    }

    /// Returns the number of listeners registered on `id`.
    pub fn listener_count(&self, id: NodeId) -> usize {
        self.inner
            .read()
            .nodes
            .get(&id)
            .map_or(0, |n| n.listeners.len())
    }

    fn is_listening(&self, id: NodeId, listener: ListenerId) -> bool {
        self.inner
            .read()
            .nodes
            .get(&id)
            .is_some_and(|n| n.listeners.iter().any(|l| l.id == listener))
    }

    /// Dispatches `event` from `origin` toward the root.
    ///
    /// Visits `origin` and then each ancestor, nearest first, running the
    /// listeners registered for the event's name in registration order. The
    /// path is computed once, before any listener runs.
    ///
    /// # Returns
    ///
    /// `true` if a listener stopped propagation, `false` if the event reached
    /// the end of the path (or `origin` does not exist).
    pub fn dispatch(&self, origin: NodeId, event: &mut dyn TreeEvent) -> bool {
        let event_name = event.event_name();
        let span = span!(Level::TRACE, "dispatch", event_name, origin = %origin);
        let _enter = span.enter();

        let path = {
            let inner = self.inner.read();
            if !inner.nodes.contains_key(&origin) {
                return false;
            }
            let mut path = vec![origin];
            path.extend(inner.ancestors(origin));
            path
        };

        for node in path {
            let handlers: Vec<(ListenerId, Listener)> = {
                let inner = self.inner.read();
                let Some(data) = inner.nodes.get(&node) else {
                    continue;
                };
                data.listeners
                    .iter()
                    .filter(|l| l.event_name == event_name)
                    .map(|l| (l.id, Arc::clone(&l.handler)))
                    .collect()
            };

            for (listener, handler) in handlers {
                // Listeners removed by an earlier handler in this pass are skipped.
                if !self.is_listening(node, listener) {
                    continue;
                }
                handler(event);
                if !event.is_propagating() {
                    trace!(node = %node, "Propagation stopped");
                    return true;
                }
            }
        }

        false
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.len())
            .field("options", &self.options)
            .finish()
    }
}
