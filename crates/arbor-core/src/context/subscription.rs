//! Subscription tokens and unsubscribe handles.

use std::fmt;
use std::sync::Weak;

/// Opaque identity of one subscriber within a provider.
///
/// Every subscribing request gets a fresh token, so the same callback
/// subscribed twice occupies two entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// The provider-side store an [`Unsubscribe`] handle points back into.
pub(crate) trait SubscriberRegistry: Send + Sync {
    /// Removes the subscriber. Returns `false` if it was not registered.
    fn remove(&self, id: SubscriptionId) -> bool;

    /// Returns `true` if the subscriber is registered.
    fn contains(&self, id: SubscriptionId) -> bool;
}

/// Handle that removes one subscriber from its provider.
///
/// Holds the provider weakly. Calling [`unsubscribe`](Self::unsubscribe) more
/// than once, or after the provider was disposed or dropped, does nothing.
#[derive(Clone)]
pub struct Unsubscribe {
    registry: Weak<dyn SubscriberRegistry>,
    id: SubscriptionId,
}

impl Unsubscribe {
    pub(crate) fn new(registry: Weak<dyn SubscriberRegistry>, id: SubscriptionId) -> Self {
        Self { registry, id }
    }

    /// The subscriber this handle removes.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Removes the subscriber. Returns `true` only for the call that actually
    /// removed it.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }

    /// Returns `true` while the subscriber still receives updates.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
