//! The context channel.
//!
//! A node publishes a keyed value with [`provide`]; any descendant obtains it
//! with [`consume`] without knowing which ancestor supplies it.
//!
//! # Protocol
//!
//! 1. `consume` builds a [`ContextRequest`] and dispatches it from the
//!    consumer node toward the root.
//! 2. Every provider listener on the way checks the request's key. The first
//!    one that matches stops propagation and invokes the request's callback
//!    synchronously with its current value. Providers of the same key further
//!    up never see the request (nearest wins).
//! 3. A subscribing request is also added to the provider's subscriber list;
//!    [`ContextProvider::update`] pushes each new value to that list in
//!    subscription order.
//! 4. [`ContextProvider::dispose`] removes the listener and drops every
//!    subscriber.
//!
//! # Failure modes
//!
//! None of these are errors; each resolves by absence of effect:
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | No ancestor provides the key | callback never runs |
//! | `update` after `dispose` | value replaced, nobody notified |
//! | Unsubscribing twice | second call does nothing |
//! | Consumer expects another value type | request consumed, nothing delivered, `warn!` logged |
//!
//! ```rust,ignore
//! use arbor_core::{ContextKey, Tree, NodeId};
//!
//! const MODE: ContextKey = ContextKey::named("app", "mode");
//!
//! let tree = Tree::new();
//! let parent = tree.create_node("div");
//! let child = tree.create_node("div");
//! tree.append_child(NodeId::ROOT, parent)?;
//! tree.append_child(parent, child)?;
//!
//! let provider = tree.node(parent).provide(MODE, "light".to_string());
//! let consumer = tree.node(child).consume(MODE, |mode: &String| println!("mode = {mode}"));
//!
//! provider.update("dark".to_string()); // prints "mode = dark"
//! consumer.unsubscribe();
//! ```

mod consumer;
mod provider;
mod request;
mod subscription;

pub use consumer::{ContextConsumer, consume, consume_once, request_value};
pub use provider::{ContextProvider, provide};
pub use request::{CONTEXT_REQUEST, ContextRequest};
pub use subscription::{SubscriptionId, Unsubscribe};

use crate::key::ContextKey;
use crate::tree::NodeRef;

impl NodeRef {
    /// Publishes `initial` under `key` for this node's descendants.
    pub fn provide<V>(&self, key: ContextKey, initial: V) -> ContextProvider<V>
    where
        V: Send + Sync + 'static,
    {
        provide(self.tree(), self.id(), key, initial)
    }

    /// Subscribes to `key` as provided by the nearest ancestor.
    pub fn consume<V, F>(&self, key: ContextKey, callback: F) -> ContextConsumer
    where
        V: Send + Sync + 'static,
        F: Fn(&V) + Send + Sync + 'static,
    {
        consume(self.tree(), self.id(), key, callback, true)
    }

    /// Reads `key` once from the nearest ancestor.
    pub fn consume_once<V, F>(&self, key: ContextKey, callback: F)
    where
        V: Send + Sync + 'static,
        F: Fn(&V) + Send + Sync + 'static,
    {
        consume_once(self.tree(), self.id(), key, callback)
    }

    /// Returns a copy of the value the nearest ancestor provides for `key`.
    pub fn request_value<V>(&self, key: ContextKey) -> Option<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        request_value(self.tree(), self.id(), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeId, Tree};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MODE: ContextKey = ContextKey::named("test", "mode");
    const LOCALE: ContextKey = ContextKey::named("test", "locale");

    /// root → parent → child
    fn setup() -> (Tree, NodeId, NodeId) {
        let tree = Tree::new();
        let parent = tree.create_node("parent");
        let child = tree.create_node("child");
        tree.append_child(NodeId::ROOT, parent).unwrap();
        tree.append_child(parent, child).unwrap();
        (tree, parent, child)
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&String) + Send + Sync + 'static) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, move |value: &String| sink.lock().push(value.clone()))
    }

    #[test]
    fn test_consumer_receives_value_synchronously() {
        let (tree, parent, child) = setup();
        let _provider = provide(&tree, parent, MODE, "light".to_string());

        let (log, cb) = recorder();
        consume(&tree, child, MODE, cb, true);
        assert_eq!(*log.lock(), vec!["light"]);
    }

    #[test]
    fn test_delivery_to_deep_descendant() {
        let (tree, parent, child) = setup();
        let grandchild = tree.create_node("grandchild");
        tree.append_child(child, grandchild).unwrap();
        let _provider = provide(&tree, parent, MODE, "light".to_string());

        assert_eq!(
            request_value::<String>(&tree, grandchild, MODE).as_deref(),
            Some("light")
        );
    }

    #[test]
    fn test_nearest_provider_wins() {
        let (tree, outer, inner) = setup();
        let leaf = tree.create_node("leaf");
        tree.append_child(inner, leaf).unwrap();

        let outer_provider = provide(&tree, outer, MODE, "outer".to_string());
        let inner_provider = provide(&tree, inner, MODE, "inner".to_string());

        let (log, cb) = recorder();
        consume(&tree, leaf, MODE, cb, true);
        assert_eq!(*log.lock(), vec!["inner"]);
        assert_eq!(outer_provider.subscriber_count(), 0);
        assert_eq!(inner_provider.subscriber_count(), 1);

        outer_provider.update("outer-2".to_string());
        assert_eq!(*log.lock(), vec!["inner"]);
    }

    #[test]
    fn test_other_keys_pass_through() {
        let (tree, outer, inner) = setup();
        let leaf = tree.create_node("leaf");
        tree.append_child(inner, leaf).unwrap();

        let _mode = provide(&tree, outer, MODE, "dark".to_string());
        let _locale = provide(&tree, inner, LOCALE, "en".to_string());

        assert_eq!(
            request_value::<String>(&tree, leaf, MODE).as_deref(),
            Some("dark")
        );
        assert_eq!(
            request_value::<String>(&tree, leaf, LOCALE).as_deref(),
            Some("en")
        );
    }

    #[test]
    fn test_node_does_not_serve_itself() {
        let (tree, parent, child) = setup();
        let _outer = provide(&tree, parent, MODE, "outer".to_string());
        let _own = provide(&tree, child, MODE, "own".to_string());

        assert_eq!(
            request_value::<String>(&tree, child, MODE).as_deref(),
            Some("outer")
        );
    }

    #[test]
    fn test_update_fans_out_in_order() {
        let (tree, parent, child) = setup();
        let provider = provide(&tree, parent, MODE, "light".to_string());

        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            consume(
                &tree,
                child,
                MODE,
                move |value: &String| order.lock().push(format!("{i}:{value}")),
                true,
            );
        }
        order.lock().clear();

        provider.update("dark".to_string());
        assert_eq!(*order.lock(), vec!["0:dark", "1:dark", "2:dark"]);
        assert_eq!(provider.value().as_str(), "dark");
        assert_eq!(provider.subscriber_count(), 3);
    }

    #[test]
    fn test_one_shot_request_does_not_subscribe() {
        let (tree, parent, child) = setup();
        let provider = provide(&tree, parent, MODE, "light".to_string());

        let (log, cb) = recorder();
        let consumer = consume(&tree, child, MODE, cb, false);
        assert_eq!(provider.subscriber_count(), 0);
        assert!(!consumer.is_subscribed());

        provider.update("dark".to_string());
        consumer.unsubscribe();
        assert_eq!(*log.lock(), vec!["light"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let (tree, parent, child) = setup();
        let provider = provide(&tree, parent, MODE, "light".to_string());

        let (log, cb) = recorder();
        let consumer = consume(&tree, child, MODE, cb, true);
        assert!(consumer.is_subscribed());

        consumer.unsubscribe();
        consumer.unsubscribe();
        assert!(!consumer.is_subscribed());
        assert_eq!(provider.subscriber_count(), 0);

        provider.update("dark".to_string());
        assert_eq!(*log.lock(), vec!["light"]);
    }

    #[test]
    fn test_dispose_silences_updates_but_keeps_value() {
        let (tree, parent, child) = setup();
        let provider = provide(&tree, parent, MODE, "light".to_string());

        let (log, cb) = recorder();
        let consumer = consume(&tree, child, MODE, cb, true);
        provider.update("dark".to_string());

        provider.dispose();
        assert!(provider.is_disposed());
        assert_eq!(tree.listener_count(parent), 0);
        assert!(!consumer.is_subscribed());

        provider.update("new".to_string());
        assert_eq!(*log.lock(), vec!["light", "dark"]);
        // The write still lands even though nobody hears it.
        assert_eq!(provider.value().as_str(), "new");

        // Disposed providers no longer answer requests.
        assert_eq!(request_value::<String>(&tree, child, MODE), None);
        consumer.unsubscribe();
        provider.dispose();
    }

    #[test]
    fn test_no_provider_never_calls_back() {
        let (tree, _parent, child) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let consumer = consume(
            &tree,
            child,
            MODE,
            move |_: &String| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            true,
        );
        consumer.unsubscribe();
        consumer.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!consumer.is_subscribed());
    }

    #[test]
    fn test_type_mismatch_is_consumed_without_delivery() {
        let (tree, outer, inner) = setup();
        let leaf = tree.create_node("leaf");
        tree.append_child(inner, leaf).unwrap();

        let _outer = provide(&tree, outer, MODE, 7_u32);
        let inner_provider = provide(&tree, inner, MODE, "light".to_string());

        // The inner provider holds a `String`; the `u32` provider above never
        // sees the request.
        assert_eq!(request_value::<u32>(&tree, leaf, MODE), None);
        assert_eq!(inner_provider.subscriber_count(), 0);
    }

    #[test]
    fn test_self_unsubscribe_during_update() {
        let (tree, parent, child) = setup();
        let provider = provide(&tree, parent, MODE, 0_u32);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let handle: Arc<Mutex<Option<ContextConsumer>>> = Arc::default();
        let (seen_a, handle_a) = (Arc::clone(&seen), Arc::clone(&handle));
        let consumer = consume(
            &tree,
            child,
            MODE,
            move |value: &u32| {
                seen_a.lock().push(("a", *value));
                if *value == 1
                    && let Some(consumer) = handle_a.lock().clone()
                {
                    consumer.unsubscribe();
                }
            },
            true,
        );
        *handle.lock() = Some(consumer);

        let seen_b = Arc::clone(&seen);
        consume(
            &tree,
            child,
            MODE,
            move |value: &u32| seen_b.lock().push(("b", *value)),
            true,
        );

        provider.update(1);
        provider.update(2);
        assert_eq!(
            *seen.lock(),
            vec![("a", 0), ("b", 0), ("a", 1), ("b", 1), ("b", 2)]
        );
        assert_eq!(provider.subscriber_count(), 1);
    }

    #[test]
    fn test_removal_during_fan_out_applies_to_next_update() {
        let (tree, parent, child) = setup();
        let provider = provide(&tree, parent, MODE, 0_u32);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<ContextConsumer>>> = Arc::default();

        let (seen_a, victim_a) = (Arc::clone(&seen), Arc::clone(&victim));
        consume(
            &tree,
            child,
            MODE,
            move |value: &u32| {
                seen_a.lock().push(("a", *value));
                if let Some(victim) = victim_a.lock().clone() {
                    victim.unsubscribe();
                }
            },
            true,
        );
        let seen_b = Arc::clone(&seen);
        let b = consume(
            &tree,
            child,
            MODE,
            move |value: &u32| seen_b.lock().push(("b", *value)),
            true,
        );
        *victim.lock() = Some(b);
        seen.lock().clear();

        // `b` is removed by `a` mid-pass but still sees this update.
        provider.update(1);
        provider.update(2);
        assert_eq!(*seen.lock(), vec![("a", 1), ("b", 1), ("a", 2)]);
    }

    #[test]
    fn test_reentrant_update_from_subscriber() {
        let (tree, parent, child) = setup();
        let provider = provide(&tree, parent, MODE, 0_u32);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let (seen_a, nested) = (Arc::clone(&seen), provider.clone());
        consume(
            &tree,
            child,
            MODE,
            move |value: &u32| {
                seen_a.lock().push(*value);
                if *value == 1 {
                    nested.update(2);
                }
            },
            true,
        );

        provider.update(1);
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
        assert_eq!(*provider.value(), 2);
    }

    #[test]
    fn test_update_with_derives_from_current() {
        let (tree, parent, child) = setup();
        let provider = provide(&tree, parent, MODE, 1_u32);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        consume(&tree, child, MODE, move |v: &u32| sink.lock().push(*v), true);

        provider.update_with(|v| v * 10);
        assert_eq!(*seen.lock(), vec![1, 10]);
    }

    #[test]
    fn test_detached_consumer_cannot_reach_provider() {
        let (tree, parent, child) = setup();
        let _provider = provide(&tree, parent, MODE, "light".to_string());

        tree.remove(child).unwrap();
        assert_eq!(request_value::<String>(&tree, child, MODE), None);

        tree.append_child(parent, child).unwrap();
        assert_eq!(
            request_value::<String>(&tree, child, MODE).as_deref(),
            Some("light")
        );
    }

    #[test]
    fn test_unique_keys_do_not_collide() {
        let (tree, parent, child) = setup();
        let first = ContextKey::unique("mode");
        let second = ContextKey::unique("mode");
        let _provider = provide(&tree, parent, first, "light".to_string());

        assert_eq!(request_value::<String>(&tree, child, second), None);
        assert_eq!(
            request_value::<String>(&tree, child, first).as_deref(),
            Some("light")
        );
    }

    #[test]
    fn test_provide_on_missing_node_serves_nothing() {
        let tree = Tree::new();
        let provider = provide(&tree, NodeId(42), MODE, 1_u32);
        provider.update(2);
        assert_eq!(*provider.value(), 2);
        provider.dispose();
    }

    #[test]
    fn test_node_ref_helpers() {
        let (tree, parent, child) = setup();
        let provider = tree.node(parent).provide(MODE, 3_u32);
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let consumer = tree.node(child).consume(MODE, move |v: &u32| {
            sink.store(*v as usize, Ordering::SeqCst);
        });
        provider.update(5);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
        assert_eq!(tree.node(child).request_value::<u32>(MODE), Some(5));
        consumer.unsubscribe();
    }
}
