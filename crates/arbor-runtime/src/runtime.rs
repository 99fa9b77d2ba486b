//! Runtime setup: configuration, logging and a configured [`Tree`].
//!
//! ```rust,ignore
//! use arbor_runtime::ArborRuntime;
//!
//! // Auto-loads arbor.toml from the current directory, if present
//! let runtime = ArborRuntime::new();
//!
//! // Custom configuration path
//! let runtime = ArborRuntime::builder()
//!     .config_file("config/arbor.toml")
//!     .build()?;
//!
//! let app = runtime.mount("app", Arc::new(App::default()))?;
//! ```

use std::path::Path;
use std::sync::Arc;

use arbor_core::{Element, NodeId, NodeRef, Tree};
use tracing::{debug, info};

use crate::config::{ArborConfig, ConfigLoader, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Owns the loaded configuration and the tree built from it.
pub struct ArborRuntime {
    config: ArborConfig,
    tree: Tree,
}

impl Default for ArborRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ArborRuntime {
    /// Creates a runtime from the default configuration locations.
    ///
    /// Falls back to built-in defaults if loading fails.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .and_then(|config| validate_config(&config).map(|()| config))
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                ArborConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Initializes logging unless a subscriber is already installed.
    pub fn from_config(config: &ArborConfig) -> Self {
        Self::assemble(config.clone(), true)
    }

    fn assemble(config: ArborConfig, init_logging: bool) -> Self {
        if init_logging {
            logging::init_from_config(&config.logging);
        }

        let tree = Tree::with_options(config.tree.to_options());

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            max_depth = config.tree.max_depth,
            "Runtime initialized from configuration"
        );

        Self { config, tree }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ArborConfig {
        &self.config
    }

    /// Returns a handle to the tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Returns the root node.
    pub fn root(&self) -> NodeRef {
        self.tree.root()
    }

    /// Creates an element node and appends it to the root.
    pub fn mount(&self, tag: &str, element: Arc<dyn Element>) -> RuntimeResult<NodeId> {
        self.mount_under(NodeId::ROOT, tag, element)
    }

    /// Creates an element node and appends it under `parent`.
    ///
    /// The node is destroyed again if it cannot be attached.
    pub fn mount_under(
        &self,
        parent: NodeId,
        tag: &str,
        element: Arc<dyn Element>,
    ) -> RuntimeResult<NodeId> {
        let id = self.tree.create_element(tag, element);
        if let Err(e) = self.tree.append_child(parent, id) {
            let _ = self.tree.destroy(id);
            return Err(e.into());
        }
        debug!(node = %id, parent = %parent, tag, "Mounted element");
        Ok(id)
    }
}

/// Builder for [`ArborRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: ArborConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Controls whether building installs the global log subscriber.
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Loads, validates and builds the runtime.
    pub fn build(self) -> RuntimeResult<ArborRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        Ok(ArborRuntime::assemble(config, self.init_logging))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use arbor_core::TreeError;
    use figment::Jail;

    use super::*;
    use crate::error::RuntimeError;

    #[derive(Default)]
    struct Counter {
        connected: AtomicUsize,
    }

    impl Element for Counter {
        fn connected(&self, _node: &NodeRef) {
            self.connected.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn quiet_builder() -> RuntimeBuilder {
        ArborRuntime::builder().without_env().init_logging(false)
    }

    #[test]
    fn test_build_applies_tree_config() {
        Jail::expect_with(|_jail| {
            let mut config = ArborConfig::default();
            config.tree.max_depth = 2;
            let runtime = quiet_builder()
                .merge(config)
                .build()
                .map_err(|e| e.to_string())?;

            assert_eq!(runtime.config().tree.max_depth, 2);
            assert_eq!(runtime.tree().options().max_depth, 2);
            Ok(())
        });
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        Jail::expect_with(|_jail| {
            let mut config = ArborConfig::default();
            config.tree.max_depth = 0;
            let result = quiet_builder().merge(config).build();
            assert!(matches!(result, Err(RuntimeError::Config(_))));
            Ok(())
        });
    }

    #[test]
    fn test_mount_connects_element() {
        Jail::expect_with(|_jail| {
            let runtime = quiet_builder().build().map_err(|e| e.to_string())?;
            let counter = Arc::new(Counter::default());

            let id = runtime
                .mount("counter", counter.clone())
                .map_err(|e| e.to_string())?;

            assert!(runtime.tree().is_connected(id));
            assert_eq!(runtime.tree().parent(id), Some(NodeId::ROOT));
            assert_eq!(counter.connected.load(Ordering::SeqCst), 1);
            Ok(())
        });
    }

    #[test]
    fn test_mount_under_respects_depth() {
        Jail::expect_with(|_jail| {
            let mut config = ArborConfig::default();
            config.tree.max_depth = 1;
            let runtime = quiet_builder()
                .merge(config)
                .build()
                .map_err(|e| e.to_string())?;

            let outer = runtime
                .mount("outer", Arc::new(Counter::default()))
                .map_err(|e| e.to_string())?;
            let before = runtime.tree().len();
            let result = runtime.mount_under(outer, "inner", Arc::new(Counter::default()));

            assert!(matches!(
                result,
                Err(RuntimeError::Tree(TreeError::DepthExceeded { .. }))
            ));
            assert_eq!(runtime.tree().len(), before);
            Ok(())
        });
    }
}
