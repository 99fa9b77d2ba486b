//! # Arbor
//!
//! Keyed context values shared down tree-shaped node hierarchies.
//!
//! ## Overview
//!
//! A node publishes a value under a [`ContextKey`](arbor_core::ContextKey).
//! Any descendant asks for that key and receives the value of its nearest
//! providing ancestor, without knowing which ancestor that is. Subscribed
//! descendants are called again whenever the provider updates.
//!
//! ```text
//! root
//! └── theme-provider   provide(THEME, light)
//!     ├── panel
//!     │   └── button   consume(THEME) → light, then dark, ...
//!     └── button       consume(THEME) → light, then dark, ...
//! ```
//!
//! - **Core** ([`core`]): keys, the tree substrate and the context channel
//! - **Runtime** ([`runtime`]): configuration, logging and [`ArborRuntime`](arbor_runtime::ArborRuntime)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use arbor::prelude::*;
//!
//! context_key! {
//!     pub static THEME = ("app", "theme");
//! }
//!
//! let runtime = ArborRuntime::new();
//! let tree = runtime.tree();
//!
//! let panel = tree.create_node("panel");
//! tree.append_child(NodeId::ROOT, panel)?;
//! let provider = provide(tree, panel, THEME, String::from("light"));
//!
//! let button = tree.create_node("button");
//! tree.append_child(panel, button)?;
//! let handle = consume(tree, button, THEME, |mode: &String| println!("{mode}"), true);
//!
//! provider.update(String::from("dark"));
//! handle.unsubscribe();
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use arbor_core as core;
pub use arbor_runtime as runtime;

pub use arbor_core::context_key;

/// Prelude module for convenient imports.
pub mod prelude {
    // Runtime - main entry point
    pub use arbor_runtime::{ArborConfig, ArborRuntime};

    // Keys
    pub use arbor_core::{ContextKey, context_key};

    // Tree substrate
    pub use arbor_core::{Element, NodeId, NodeRef, Tree, TreeError, TreeEvent};

    // Context channel
    pub use arbor_core::{
        ContextConsumer, ContextProvider, Unsubscribe, consume, consume_once, provide,
        request_value,
    };

    // Lifecycle glue
    pub use arbor_core::{ConsumerSlot, ProviderSlot};
}
