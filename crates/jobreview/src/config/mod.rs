pub mod loader;
pub mod schema;

pub use loader::{
    apply_environment_override, load_config, load_config_from_str, validate_config,
    ENVIRONMENT_VAR,
};
pub use schema::{default_config_path, EndpointsConfig, Environment, FailurePolicy, ReviewConfig};
