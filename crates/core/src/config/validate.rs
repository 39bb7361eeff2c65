use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - Server port is not 0
/// - At least one staging zone is configured
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.facility.staging_zones == 0 {
        return Err(ConfigError::ValidationError(
            "facility.staging_zones must be at least 1".to_string(),
        ));
    }

    Ok(())
}
