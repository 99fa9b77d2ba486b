//! Arbor Runtime - configuration and logging around an Arbor [`Tree`].
//!
//! This crate provides:
//! - Layered configuration (`arbor.toml` / `arbor.yaml`, `ARBOR_*` env vars)
//! - Logging setup on `tracing-subscriber`
//! - [`ArborRuntime`], which owns a tree built from [`TreeConfig`]
//!
//! ```ignore
//! use arbor_runtime::ArborRuntime;
//!
//! fn main() -> anyhow::Result<()> {
//!     let runtime = ArborRuntime::builder().build()?;
//!     let app = runtime.mount("app", std::sync::Arc::new(App::default()))?;
//!     Ok(())
//! }
//! ```
//!
//! [`Tree`]: arbor_core::Tree

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ArborConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, TreeConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{ArborRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude with the common logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
