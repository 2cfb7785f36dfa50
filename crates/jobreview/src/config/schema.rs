use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ordering::OrderingKind;
use crate::paging::DEFAULT_RADIUS;

/// Which backend deployment to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn parse(value: &str) -> Option<Environment> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with an optimistic label change the server did not accept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep the local label and report the failure.
    #[default]
    KeepOptimistic,
    /// Revert to the previous label, unless a newer change superseded it.
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_development_endpoint")]
    pub development: String,
    #[serde(default = "default_production_endpoint")]
    pub production: String,
}

fn default_development_endpoint() -> String {
    "http://localhost:5000".to_string()
}

fn default_production_endpoint() -> String {
    "http://localhost:5000".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            development: default_development_endpoint(),
            production: default_production_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    pub version: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_page_radius")]
    pub page_radius: u32,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub ordering: OrderingKind,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_notification_capacity")]
    pub notification_capacity: usize,
}

fn default_page_size() -> u32 {
    50
}

fn default_page_radius() -> u32 {
    DEFAULT_RADIUS
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_notification_capacity() -> usize {
    256
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            environment: Environment::default(),
            endpoints: EndpointsConfig::default(),
            page_size: default_page_size(),
            page_radius: default_page_radius(),
            failure_policy: FailurePolicy::default(),
            ordering: OrderingKind::default(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            notification_capacity: default_notification_capacity(),
        }
    }
}

impl ReviewConfig {
    /// Base URL for the selected environment, without a trailing slash.
    pub fn base_url(&self) -> &str {
        let url = match self.environment {
            Environment::Development => &self.endpoints.development,
            Environment::Production => &self.endpoints.production,
        };
        url.trim_end_matches('/')
    }
}

/// `~/.jobreview/config.json`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".jobreview").join("config.json"))
}
