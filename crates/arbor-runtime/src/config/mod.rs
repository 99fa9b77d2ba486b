//! Configuration for the Arbor runtime.
//!
//! Settings cover logging and the tree substrate. They are layered from
//! defaults, config files and `ARBOR_*` environment variables by
//! [`ConfigLoader`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ArborConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig, TreeConfig,
};
pub use validation::validate_config;
