//! Bubbling events and listeners.
//!
//! Any type implementing [`TreeEvent`] can be dispatched through a
//! [`Tree`](super::Tree). Dispatch visits the origin node and then its
//! ancestors, nearest first, and stops as soon as a listener calls
//! [`stop_propagation`](TreeEvent::stop_propagation). Listeners downcast the
//! event through [`as_any_mut`](TreeEvent::as_any_mut) to read its payload.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An event that bubbles from a node toward the root.
pub trait TreeEvent: Any {
    /// Name listeners register for.
    fn event_name(&self) -> &'static str;

    /// Returns `true` while the event should keep visiting listeners.
    fn is_propagating(&self) -> bool;

    /// Halts dispatch immediately, including remaining listeners on the
    /// current node. This cannot be undone.
    fn stop_propagation(&mut self);

    /// Returns `self` as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A listener callback registered on a node.
pub type Listener = Arc<dyn Fn(&mut dyn TreeEvent) + Send + Sync>;

/// Handle returned by [`Tree::add_listener`](super::Tree::add_listener).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) struct ListenerEntry {
    pub(crate) id: ListenerId,
    pub(crate) event_name: &'static str,
    pub(crate) handler: Listener,
}

impl fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("id", &self.id)
            .field("event_name", &self.event_name)
            .finish_non_exhaustive()
    }
}
