//! Consumer side of the context channel.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::request::{ContextCallback, ContextRequest};
use super::subscription::Unsubscribe;
use crate::key::ContextKey;
use crate::tree::{NodeId, Tree};

/// Handle returned by [`consume`].
///
/// Dropping it does **not** unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe) explicitly.
#[derive(Clone, Default)]
pub struct ContextConsumer {
    /// Filled by the first delivery of a subscribing request.
    /// `None` for one-shot requests.
    captured: Option<Arc<Mutex<Option<Unsubscribe>>>>,
}

impl ContextConsumer {
    /// Stops receiving updates.
    ///
    /// Does nothing if no provider ever answered, if the request was one-shot,
    /// or if called again.
    pub fn unsubscribe(&self) {
        let handle = self
            .captured
            .as_ref()
            .and_then(|captured| captured.lock().take());
        if let Some(handle) = handle {
            handle.unsubscribe();
        }
    }

    /// Returns `true` while a provider is pushing updates to this consumer.
    pub fn is_subscribed(&self) -> bool {
        let handle = self
            .captured
            .as_ref()
            .and_then(|captured| captured.lock().clone());
        handle.is_some_and(|h| h.is_active())
    }
}

impl fmt::Debug for ContextConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextConsumer")
            .field("subscribing", &self.captured.is_some())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

/// Requests the value published under `key` by the nearest strict ancestor of
/// `node`.
///
/// If a provider answers, `callback` runs before this function returns. With
/// `subscribe` set it also runs on every later
/// [`update`](super::ContextProvider::update) until the returned handle is
/// unsubscribed or the provider is disposed. If no ancestor provides `key`,
/// nothing happens.
pub fn consume<V, F>(
    tree: &Tree,
    node: NodeId,
    key: ContextKey,
    callback: F,
    subscribe: bool,
) -> ContextConsumer
where
    V: Send + Sync + 'static,
    F: Fn(&V) + Send + Sync + 'static,
{
    let captured: Arc<Mutex<Option<Unsubscribe>>> = Arc::default();
    let slot = Arc::clone(&captured);
    let trampoline: ContextCallback<V> =
        Arc::new(move |value: &V, unsubscribe: Option<Unsubscribe>| {
            if let Some(unsubscribe) = unsubscribe {
                *slot.lock() = Some(unsubscribe);
            }
            callback(value);
        });

    let mut request = ContextRequest::new(key, node, subscribe, trampoline);
    if tree.dispatch(node, &mut request) {
        trace!(key = %key, node = %node, "Context request served");
    } else if tree.options().log_unhandled_requests {
        debug!(key = %key, node = %node, "No provider for context request");
    }

    ContextConsumer {
        captured: subscribe.then_some(captured),
    }
}

/// Requests the current value once, without subscribing.
pub fn consume_once<V, F>(tree: &Tree, node: NodeId, key: ContextKey, callback: F)
where
    V: Send + Sync + 'static,
    F: Fn(&V) + Send + Sync + 'static,
{
    consume(tree, node, key, callback, false);
}

/// Returns a copy of the value an ancestor provides for `key`, if any.
pub fn request_value<V>(tree: &Tree, node: NodeId, key: ContextKey) -> Option<V>
where
    V: Clone + Send + Sync + 'static,
{
    let received: Arc<Mutex<Option<V>>> = Arc::default();
    let sink = Arc::clone(&received);
    consume_once(tree, node, key, move |value: &V| {
        *sink.lock() = Some(value.clone());
    });
    received.lock().take()
}
