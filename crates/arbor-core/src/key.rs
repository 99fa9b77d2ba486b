//! Context keys and the link-time key registry.
//!
//! A [`ContextKey`] selects one logical channel. Keys come in two forms:
//!
//! - **Named** keys compare by `(namespace, name)` string equality and can be
//!   built in `const` context, so two crates that agree on the strings share a
//!   channel.
//! - **Unique** keys carry a process-unique token and are only equal to
//!   themselves (and their copies).
//!
//! Named keys declared with [`context_key!`](crate::context_key) are also
//! recorded in [`CONTEXT_KEYS`], a `linkme` distributed slice, which makes the
//! set of channels a program uses explicit and discoverable at runtime.
//!
//! ```rust,ignore
//! arbor_core::context_key! {
//!     /// Current colour scheme.
//!     pub static THEME = ("demo", "theme");
//! }
//!
//! assert!(arbor_core::find_key("demo", "theme").is_some());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use linkme::distributed_slice;

/// Registry of every named key declared through [`context_key!`](crate::context_key).
#[distributed_slice]
pub static CONTEXT_KEYS: [ContextKey];

static NEXT_UNIQUE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeyRepr {
    Named {
        namespace: &'static str,
        name: &'static str,
    },
    Unique {
        token: u64,
        label: &'static str,
    },
}

/// Opaque identifier for a context channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKey {
    repr: KeyRepr,
}

impl ContextKey {
    /// Creates a named key. Two named keys are equal when both strings match.
    pub const fn named(namespace: &'static str, name: &'static str) -> Self {
        Self {
            repr: KeyRepr::Named { namespace, name },
        }
    }

    /// Creates a key that is distinct from every other key in the process.
    ///
    /// The label is only used for display and logging.
    pub fn unique(label: &'static str) -> Self {
        let token = NEXT_UNIQUE.fetch_add(1, Ordering::Relaxed);
        Self {
            repr: KeyRepr::Unique { token, label },
        }
    }

    /// Returns the namespace of a named key.
    pub fn namespace(&self) -> Option<&'static str> {
        match self.repr {
            KeyRepr::Named { namespace, .. } => Some(namespace),
            KeyRepr::Unique { .. } => None,
        }
    }

    /// Returns the key's name, or the label of a unique key.
    pub fn name(&self) -> &'static str {
        match self.repr {
            KeyRepr::Named { name, .. } => name,
            KeyRepr::Unique { label, .. } => label,
        }
    }

    /// Returns `true` for keys created with [`ContextKey::unique`].
    pub fn is_unique(&self) -> bool {
        matches!(self.repr, KeyRepr::Unique { .. })
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            KeyRepr::Named { namespace, name } => write!(f, "{namespace}::{name}"),
            KeyRepr::Unique { token, label } => write!(f, "{label}#{token}"),
        }
    }
}

impl fmt::Debug for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextKey({self})")
    }
}

/// Returns every key declared with [`context_key!`](crate::context_key) in the
/// final binary.
pub fn registered_keys() -> &'static [ContextKey] {
    &CONTEXT_KEYS
}

/// Looks up a declared key by namespace and name.
pub fn find_key(namespace: &str, name: &str) -> Option<ContextKey> {
    CONTEXT_KEYS
        .iter()
        .find(|key| key.namespace() == Some(namespace) && key.name() == name)
        .copied()
}

/// Declares a named [`ContextKey`] static and records it in [`CONTEXT_KEYS`].
///
/// ```rust,ignore
/// arbor_core::context_key! {
///     pub static LOCALE = ("app", "locale");
/// }
/// ```
#[macro_export]
macro_rules! context_key {
    ($(#[$meta:meta])* $vis:vis static $ident:ident = ($namespace:literal, $name:literal);) => {
        $(#[$meta])*
        #[$crate::linkme::distributed_slice($crate::key::CONTEXT_KEYS)]
        #[linkme(crate = $crate::linkme)]
        $vis static $ident: $crate::key::ContextKey =
            $crate::key::ContextKey::named($namespace, $name);
    };
}
