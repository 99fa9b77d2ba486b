//! # Arbor Core
//!
//! A context channel for tree-shaped node hierarchies.
//!
//! A node anywhere in the tree publishes a keyed value ("provider"); any
//! descendant ("consumer") requests it without knowing which ancestor supplies
//! it and can subscribe to later updates.
//!
//! ## Layers
//!
//! - **Keys** ([`key`]): named or unique [`ContextKey`]s, plus a link-time
//!   registry of declared keys.
//! - **Tree substrate** ([`tree`]): nodes, bubbling [`TreeEvent`] dispatch,
//!   observed attributes and `connected` / `disconnected` hooks for
//!   [`Element`]s.
//! - **Context channel** ([`context`]): [`provide`] / [`consume`] and the
//!   request, subscription and disposal protocol.
//! - **Lifecycle glue** ([`lifecycle`]): [`ProviderSlot`] and
//!   [`ConsumerSlot`], which tie the channel to element hooks.
//!
//! ```text
//! ┌──────────────┐  request (bubbles up)   ┌──────────────┐
//! │   consumer   │────────────────────────▶│   provider   │  nearest match
//! │ (descendant) │◀────────────────────────│  (ancestor)  │  stops the request
//! └──────────────┘  value, then updates    └──────────────┘
//! ```

pub mod context;
pub mod error;
pub mod key;
pub mod lifecycle;
pub mod tree;

pub use context::{
    CONTEXT_REQUEST, ContextConsumer, ContextProvider, ContextRequest, SubscriptionId,
    Unsubscribe, consume, consume_once, provide, request_value,
};
pub use error::{TreeError, TreeResult};
pub use key::{CONTEXT_KEYS, ContextKey, find_key, registered_keys};
pub use lifecycle::{ConsumerSlot, ProviderSlot};
pub use tree::{Element, Listener, ListenerId, NodeId, NodeRef, Tree, TreeEvent, TreeOptions};

#[doc(hidden)]
pub use linkme;

/// Prelude for common imports.
pub mod prelude {
    pub use super::context::{ContextConsumer, ContextProvider, consume, provide};
    pub use super::key::ContextKey;
    pub use super::lifecycle::{ConsumerSlot, ProviderSlot};
    pub use super::tree::{Element, NodeId, NodeRef, Tree};
}
