//! The context request event.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use super::subscription::Unsubscribe;
use crate::key::ContextKey;
use crate::tree::{NodeId, TreeEvent};

/// Event name context requests are dispatched under.
pub const CONTEXT_REQUEST: &str = "context-request";

/// Callback carried by a request. Subscribing requests receive an
/// [`Unsubscribe`] handle alongside the value.
pub(crate) type ContextCallback<V> = Arc<dyn Fn(&V, Option<Unsubscribe>) + Send + Sync>;

/// A request for the value of one context key, bubbling from a consumer
/// toward its ancestors.
///
/// The request lives only for the duration of one dispatch. If no provider
/// serves it, it is dropped without effect.
pub struct ContextRequest {
    key: ContextKey,
    origin: NodeId,
    subscribe: bool,
    /// A `ContextCallback<V>` for the value type the consumer expects.
    callback: Box<dyn Any + Send + Sync>,
    value_type: &'static str,
    propagating: bool,
}

impl ContextRequest {
    pub(crate) fn new<V: Send + Sync + 'static>(
        key: ContextKey,
        origin: NodeId,
        subscribe: bool,
        callback: ContextCallback<V>,
    ) -> Self {
        Self {
            key,
            origin,
            subscribe,
            callback: Box::new(callback),
            value_type: type_name::<V>(),
            propagating: true,
        }
    }

    /// The requested key.
    pub fn key(&self) -> ContextKey {
        self.key
    }

    /// The node that issued the request.
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// Whether the consumer wants future updates.
    pub fn subscribe(&self) -> bool {
        self.subscribe
    }

    /// Type name of the value the consumer expects.
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    /// Returns the callback if the consumer expects values of type `V`.
    pub(crate) fn callback<V: 'static>(&self) -> Option<ContextCallback<V>> {
        self.callback.downcast_ref::<ContextCallback<V>>().cloned()
    }
}

impl TreeEvent for ContextRequest {
    fn event_name(&self) -> &'static str {
        CONTEXT_REQUEST
    }

    fn is_propagating(&self) -> bool {
        self.propagating
    }

    fn stop_propagation(&mut self) {
        self.propagating = false;
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Debug for ContextRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextRequest")
            .field("key", &self.key)
            .field("origin", &self.origin)
            .field("subscribe", &self.subscribe)
            .field("value_type", &self.value_type)
            .field("propagating", &self.propagating)
            .finish_non_exhaustive()
    }
}
