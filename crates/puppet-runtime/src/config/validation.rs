//! Configuration validation utilities.

use puppet_oicq::OicqConfig;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, PuppetConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &PuppetConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_oicq_config(&config.oicq)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.max_files == 0 {
        return Err(ConfigError::validation(
            "logging.max_files must be greater than 0",
        ));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid module filter name: {module:?}"
        )));
    }

    Ok(())
}

/// Account presence is not checked here; it may come from the environment.
fn validate_oicq_config(oicq: &OicqConfig) -> ConfigResult<()> {
    oicq.validate()
        .map_err(|e| ConfigError::validation(format!("oicq: {e}")))
}
