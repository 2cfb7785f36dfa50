use std::path::Path;

use crate::config::schema::{Environment, ReviewConfig};
use crate::error::ConfigError;

/// Environment variable that overrides `environment` at load time.
pub const ENVIRONMENT_VAR: &str = "JOBREVIEW_ENV";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ReviewConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<ReviewConfig, ConfigError> {
    let mut config: ReviewConfig = serde_json::from_str(content)?;

    let override_value = std::env::var(ENVIRONMENT_VAR).ok();
    apply_environment_override(&mut config, override_value.as_deref())?;

    validate_config(&config)?;

    log::debug!(
        "Loaded config for {} ({})",
        config.environment,
        config.base_url()
    );
    Ok(config)
}

/// Replaces `environment` with `value` when one is given.
pub fn apply_environment_override(
    config: &mut ReviewConfig,
    value: Option<&str>,
) -> Result<(), ConfigError> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(());
    };
    let environment = Environment::parse(value).ok_or_else(|| ConfigError::Validation {
        message: format!("{} must be 'development' or 'production', got '{}'", ENVIRONMENT_VAR, value),
    })?;
    if environment != config.environment {
        log::info!(
            "{} overrides environment {} -> {}",
            ENVIRONMENT_VAR,
            config.environment,
            environment
        );
    }
    config.environment = environment;
    Ok(())
}

pub fn validate_config(config: &ReviewConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.page_size == 0 {
        return Err(ConfigError::Validation {
            message: "page_size must be at least 1".to_string(),
        });
    }

    if config.request_timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "Timeouts must be at least 1 second".to_string(),
        });
    }

    if config.notification_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "notification_capacity must be at least 1".to_string(),
        });
    }

    validate_endpoint(Environment::Development, &config.endpoints.development)?;
    validate_endpoint(Environment::Production, &config.endpoints.production)?;

    Ok(())
}

fn validate_endpoint(environment: Environment, url: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        environment: environment.to_string(),
        url: url.to_string(),
        reason,
    };

    let parsed = reqwest::Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{}'", other))),
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}
