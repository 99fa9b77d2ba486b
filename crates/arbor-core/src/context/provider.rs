//! Provider side of the context channel.

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::request::{CONTEXT_REQUEST, ContextCallback, ContextRequest};
use super::subscription::{SubscriberRegistry, SubscriptionId, Unsubscribe};
use crate::key::ContextKey;
use crate::tree::{ListenerId, NodeId, Tree, TreeEvent};

struct ProviderInner<V> {
    value: Arc<V>,
    /// Registration order is delivery order.
    subscribers: Vec<(SubscriptionId, ContextCallback<V>)>,
    next_subscription: u64,
    listener: Option<ListenerId>,
    disposed: bool,
}

/// The provider record: current value plus subscriber set, owned by one node.
struct ProviderState<V> {
    key: ContextKey,
    node: NodeId,
    inner: Mutex<ProviderInner<V>>,
}

impl<V: Send + Sync + 'static> ProviderState<V> {
    fn unsubscribe_handle(self: &Arc<Self>, id: SubscriptionId) -> Unsubscribe {
        let weak: Weak<Self> = Arc::downgrade(self);
        Unsubscribe::new(weak, id)
    }

    /// Listener body: serves matching requests and halts their propagation.
    fn handle_request(self: &Arc<Self>, event: &mut dyn TreeEvent) {
        let Some(request) = event.as_any_mut().downcast_mut::<ContextRequest>() else {
            return;
        };
        // A node never serves its own requests.
        if request.key() != self.key || request.origin() == self.node {
            return;
        }
        if self.inner.lock().disposed {
            return;
        }

        request.stop_propagation();

        let Some(callback) = request.callback::<V>() else {
            warn!(
                key = %self.key,
                provided = type_name::<V>(),
                requested = request.value_type(),
                "Context value type mismatch, request consumed without delivery"
            );
            return;
        };

        let (value, unsubscribe) = {
            let mut inner = self.inner.lock();
            let value = Arc::clone(&inner.value);
            if request.subscribe() {
                let id = SubscriptionId(inner.next_subscription);
                inner.next_subscription += 1;
                inner.subscribers.push((id, Arc::clone(&callback)));
                (value, Some(self.unsubscribe_handle(id)))
            } else {
                (value, None)
            }
        };

        trace!(
            key = %self.key,
            provider = %self.node,
            consumer = %request.origin(),
            subscribe = request.subscribe(),
            "Serving context request"
        );
        callback(&value, unsubscribe);
    }
}

impl<V: Send + Sync + 'static> SubscriberRegistry for ProviderState<V> {
    fn remove(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sub, _)| *sub != id);
        before != inner.subscribers.len()
    }

    fn contains(&self, id: SubscriptionId) -> bool {
        self.inner.lock().subscribers.iter().any(|(sub, _)| *sub == id)
    }
}

/// Handle returned by [`provide`].
///
/// Clones share the same provider record.
pub struct ContextProvider<V> {
    tree: Tree,
    state: Arc<ProviderState<V>>,
}

impl<V> Clone for ContextProvider<V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

/// Publishes `initial` under `key` for every descendant of `node`.
///
/// Registers a request listener on `node`. The nearest provider for a key
/// serves a request and stops it there, so providers further up never see it.
/// If `node` does not exist the returned handle works but serves nothing.
pub fn provide<V>(tree: &Tree, node: NodeId, key: ContextKey, initial: V) -> ContextProvider<V>
where
    V: Send + Sync + 'static,
{
    let state = Arc::new(ProviderState {
        key,
        node,
        inner: Mutex::new(ProviderInner {
            value: Arc::new(initial),
            subscribers: Vec::new(),
            next_subscription: 1,
            listener: None,
            disposed: false,
        }),
    });

    let listener_state = Arc::clone(&state);
    match tree.add_listener(node, CONTEXT_REQUEST, move |event| {
        listener_state.handle_request(event)
    }) {
        Ok(listener) => {
            state.inner.lock().listener = Some(listener);
            debug!(key = %key, node = %node, "Context provided");
        }
        Err(e) => {
            warn!(key = %key, node = %node, error = %e, "Cannot provide context");
        }
    }

    ContextProvider {
        tree: tree.clone(),
        state,
    }
}

impl<V: Send + Sync + 'static> ContextProvider<V> {
    /// The key this provider serves.
    pub fn key(&self) -> ContextKey {
        self.state.key
    }

    /// The node this provider is registered on.
    pub fn node(&self) -> NodeId {
        self.state.node
    }

    /// Returns the current value.
    ///
    /// Still callable after [`dispose`](Self::dispose); returns the last value set.
    pub fn value(&self) -> Arc<V> {
        Arc::clone(&self.state.inner.lock().value)
    }

    /// Replaces the value and pushes it to every subscriber, in subscription
    /// order.
    ///
    /// Delivery iterates a snapshot of the subscribers taken before the first
    /// callback runs: subscribers added or removed by a callback only affect
    /// later updates. After [`dispose`](Self::dispose) the value is still
    /// replaced but there is nobody left to notify.
    pub fn update(&self, value: V) {
        let (value, subscribers) = {
            let mut inner = self.state.inner.lock();
            inner.value = Arc::new(value);
            (Arc::clone(&inner.value), inner.subscribers.clone())
        };

        debug!(
            key = %self.state.key,
            subscribers = subscribers.len(),
            "Context updated"
        );
        for (id, callback) in subscribers {
            callback(&value, Some(self.state.unsubscribe_handle(id)));
        }
    }

    /// Derives the next value from the current one, then behaves like
    /// [`update`](Self::update).
    pub fn update_with(&self, f: impl FnOnce(&V) -> V) {
        let current = self.value();
        self.update(f(&current));
    }

    /// Stops serving requests and drops every subscriber. Idempotent.
    pub fn dispose(&self) {
        let listener = {
            let mut inner = self.state.inner.lock();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.subscribers.clear();
            inner.listener.take()
        };

        if let Some(listener) = listener {
            self.tree.remove_listener(self.state.node, listener);
        }
        debug!(key = %self.state.key, node = %self.state.node, "Context disposed");
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.state.inner.lock().disposed
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.state.inner.lock().subscribers.len()
    }
}

impl<V> fmt::Debug for ContextProvider<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.state.inner.lock();
        f.debug_struct("ContextProvider")
            .field("key", &self.state.key)
            .field("node", &self.state.node)
            .field("subscribers", &inner.subscribers.len())
            .field("disposed", &inner.disposed)
            .finish()
    }
}
