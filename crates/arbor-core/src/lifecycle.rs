//! Lifecycle glue between [`Element`](crate::Element) hooks and the context
//! channel.
//!
//! Elements embed a [`ProviderSlot`] or [`ConsumerSlot`] and forward their
//! `connected` / `disconnected` hooks to it:
//!
//! ```text
//! ProviderSlot: Unattached ──attach──▶ Attached(ContextProvider) ──detach──▶ Unattached
//! ConsumerSlot: Unattached ──attach──▶ Attached(ContextConsumer) ──detach──▶ Unattached
//! ```
//!
//! Slots never hold their lock while channel callbacks run, so callbacks may
//! call back into the slot (e.g. a subscriber that updates the provider).

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::context::{ContextConsumer, ContextProvider, consume, provide};
use crate::key::ContextKey;
use crate::tree::NodeRef;

/// Provider half of a context-bearing element.
pub struct ProviderSlot<V> {
    key: ContextKey,
    handle: Mutex<Option<ContextProvider<V>>>,
}

impl<V: Send + Sync + 'static> ProviderSlot<V> {
    /// Creates an unattached slot for `key`.
    pub fn new(key: ContextKey) -> Self {
        Self {
            key,
            handle: Mutex::new(None),
        }
    }

    /// Starts providing `initial` from `node`.
    ///
    /// The handle is stored before this returns, so attribute hooks fired
    /// afterwards already see an attached slot. Attaching twice disposes the
    /// previous provider first.
    pub fn attach(&self, node: &NodeRef, initial: V) -> ContextProvider<V> {
        self.detach();
        let provider = provide(node.tree(), node.id(), self.key, initial);
        *self.handle.lock() = Some(provider.clone());
        trace!(key = %self.key, node = %node.id(), "Provider slot attached");
        provider
    }

    /// Pushes a new value. Returns `false`, and does nothing, while unattached.
    pub fn update(&self, value: V) -> bool {
        match self.handle() {
            Some(provider) => {
                provider.update(value);
                true
            }
            None => false,
        }
    }

    /// Returns the current value while attached.
    pub fn value(&self) -> Option<Arc<V>> {
        self.handle().map(|p| p.value())
    }

    /// Returns the provider handle while attached.
    pub fn handle(&self) -> Option<ContextProvider<V>> {
        self.handle.lock().clone()
    }

    /// Returns `true` while attached.
    pub fn is_attached(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Disposes the provider and returns to the unattached state.
    pub fn detach(&self) {
        let previous = self.handle.lock().take();
        if let Some(provider) = previous {
            provider.dispose();
            trace!(key = %self.key, "Provider slot detached");
        }
    }
}

impl<V> fmt::Debug for ProviderSlot<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSlot")
            .field("key", &self.key)
            .field("attached", &self.handle.lock().is_some())
            .finish()
    }
}

/// Consumer half of a context-bearing element.
pub struct ConsumerSlot {
    key: ContextKey,
    handle: Mutex<Option<ContextConsumer>>,
}

impl ConsumerSlot {
    /// Creates an unattached slot for `key`.
    pub fn new(key: ContextKey) -> Self {
        Self {
            key,
            handle: Mutex::new(None),
        }
    }

    /// Subscribes from `node`. `callback` receives the initial value (if a
    /// provider answers) and every later update.
    pub fn attach<V, F>(&self, node: &NodeRef, callback: F)
    where
        V: Send + Sync + 'static,
        F: Fn(&V) + Send + Sync + 'static,
    {
        self.detach();
        let consumer = consume(node.tree(), node.id(), self.key, callback, true);
        *self.handle.lock() = Some(consumer);
        trace!(key = %self.key, node = %node.id(), "Consumer slot attached");
    }

    /// Unsubscribes. Safe even if no value was ever delivered.
    pub fn detach(&self) {
        let previous = self.handle.lock().take();
        if let Some(consumer) = previous {
            consumer.unsubscribe();
            trace!(key = %self.key, "Consumer slot detached");
        }
    }

    /// Returns `true` while attached.
    pub fn is_attached(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Returns `true` while a provider is pushing updates to this slot.
    pub fn is_subscribed(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(ContextConsumer::is_subscribed)
    }
}

impl fmt::Debug for ConsumerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerSlot")
            .field("key", &self.key)
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Element, NodeId, Tree};

    const MODE: ContextKey = ContextKey::named("test", "mode");

    /// Provides the `mode` attribute to its descendants.
    struct ModeProvider {
        slot: ProviderSlot<String>,
        log: Mutex<Vec<String>>,
    }

    impl ModeProvider {
        fn new() -> Self {
            Self {
                slot: ProviderSlot::new(MODE),
                log: Mutex::new(Vec::new()),
            }
        }
    }

    impl Element for ModeProvider {
        fn observed_attributes(&self) -> &'static [&'static str] {
            &["mode"]
        }

        fn connected(&self, node: &NodeRef) {
            let mode = node.attribute("mode").unwrap_or_else(|| "light".into());
            self.slot.attach(node, mode.clone());
            // Normalising the attribute re-enters `attribute_changed`.
            node.set_attribute("mode", mode).unwrap();
        }

        fn disconnected(&self, _node: &NodeRef) {
            self.slot.detach();
        }

        fn attribute_changed(
            &self,
            _node: &NodeRef,
            _name: &str,
            _old: Option<&str>,
            new: Option<&str>,
        ) {
            let value = new.unwrap_or("light").to_string();
            let delivered = self.slot.update(value.clone());
            self.log.lock().push(format!("{value} delivered={delivered}"));
        }
    }

    /// Mirrors the provided mode.
    struct ModeMirror {
        slot: ConsumerSlot,
        mode: Arc<Mutex<Option<String>>>,
    }

    impl ModeMirror {
        fn new() -> Self {
            Self {
                slot: ConsumerSlot::new(MODE),
                mode: Arc::default(),
            }
        }
    }

    impl Element for ModeMirror {
        fn connected(&self, node: &NodeRef) {
            let mode = Arc::clone(&self.mode);
            self.slot.attach(node, move |value: &String| {
                *mode.lock() = Some(value.clone());
            });
        }

        fn disconnected(&self, _node: &NodeRef) {
            self.slot.detach();
        }
    }

    #[test]
    fn test_provider_slot_follows_lifecycle() {
        let tree = Tree::new();
        let provider = Arc::new(ModeProvider::new());
        let node = tree.create_element("mode-provider", provider.clone());

        // Attribute changes before attachment find no handle.
        tree.set_attribute(node, "mode", "dark").unwrap();
        assert!(!provider.slot.is_attached());

        tree.append_child(NodeId::ROOT, node).unwrap();
        assert!(provider.slot.is_attached());
        assert_eq!(provider.slot.value().as_deref().map(String::as_str), Some("dark"));

        tree.set_attribute(node, "mode", "light").unwrap();
        assert_eq!(provider.slot.value().as_deref().map(String::as_str), Some("light"));

        tree.remove(node).unwrap();
        assert!(!provider.slot.is_attached());
        assert!(!provider.slot.update("dark".into()));
        assert_eq!(tree.listener_count(node), 0);

        assert_eq!(
            *provider.log.lock(),
            vec!["dark delivered=false", "light delivered=true"]
        );
    }

    #[test]
    fn test_consumer_slot_tracks_provider() {
        let tree = Tree::new();
        let provider = Arc::new(ModeProvider::new());
        let mirror = Arc::new(ModeMirror::new());
        let p = tree.create_element("mode-provider", provider.clone());
        let m = tree.create_element("mode-mirror", mirror.clone());
        tree.set_attribute(p, "mode", "dark").unwrap();
        tree.append_child(p, m).unwrap();

        tree.append_child(NodeId::ROOT, p).unwrap();
        assert_eq!(mirror.mode.lock().as_deref(), Some("dark"));
        assert!(mirror.slot.is_subscribed());

        tree.set_attribute(p, "mode", "light").unwrap();
        assert_eq!(mirror.mode.lock().as_deref(), Some("light"));

        tree.remove(m).unwrap();
        assert!(!mirror.slot.is_attached());
        let handle = provider.slot.handle().unwrap();
        assert_eq!(handle.subscriber_count(), 0);

        tree.set_attribute(p, "mode", "dark").unwrap();
        assert_eq!(mirror.mode.lock().as_deref(), Some("light"));
    }

    #[test]
    fn test_consumer_without_provider_detaches_cleanly() {
        let tree = Tree::new();
        let mirror = Arc::new(ModeMirror::new());
        let m = tree.create_element("mode-mirror", mirror.clone());

        tree.append_child(NodeId::ROOT, m).unwrap();
        assert!(mirror.slot.is_attached());
        assert!(!mirror.slot.is_subscribed());
        assert!(mirror.mode.lock().is_none());

        tree.remove(m).unwrap();
        assert!(!mirror.slot.is_attached());
    }

    #[test]
    fn test_consumer_reattached_under_new_provider() {
        let tree = Tree::new();
        let first = Arc::new(ModeProvider::new());
        let second = Arc::new(ModeProvider::new());
        let mirror = Arc::new(ModeMirror::new());
        let a = tree.create_element("mode-provider", first.clone());
        let b = tree.create_element("mode-provider", second.clone());
        let m = tree.create_element("mode-mirror", mirror.clone());
        tree.set_attribute(a, "mode", "dark").unwrap();
        tree.set_attribute(b, "mode", "light").unwrap();
        tree.append_child(NodeId::ROOT, a).unwrap();
        tree.append_child(NodeId::ROOT, b).unwrap();
        tree.append_child(a, m).unwrap();
        assert_eq!(mirror.mode.lock().as_deref(), Some("dark"));

        // Moving re-runs the lifecycle, so the nearest provider is re-resolved.
        tree.append_child(b, m).unwrap();
        assert_eq!(mirror.mode.lock().as_deref(), Some("light"));
        assert_eq!(first.slot.handle().unwrap().subscriber_count(), 0);
        assert_eq!(second.slot.handle().unwrap().subscriber_count(), 1);
    }
}
