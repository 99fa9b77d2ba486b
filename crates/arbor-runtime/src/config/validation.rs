//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ArborConfig, LogOutput, LoggingConfig, TreeConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ArborConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_tree_config(&config.tree)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    for module in logging.filters.keys() {
        if module.is_empty() || module.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: {module:?}"
            )));
        }
    }

    Ok(())
}

/// Validates tree settings.
fn validate_tree_config(tree: &TreeConfig) -> ConfigResult<()> {
    if tree.max_depth == 0 {
        return Err(ConfigError::validation(
            "tree.max_depth must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    #[test]
    fn test_validate_default_config() {
        let config = ArborConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_depth() {
        let mut config = ArborConfig::default();
        config.tree.max_depth = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = ArborConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.logging.file_path = Some("arbor.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_filter_targets() {
        let mut config = ArborConfig::default();
        config
            .logging
            .filters
            .insert("arbor core".to_string(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
