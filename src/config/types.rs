use std::path::Path;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::api::ApiConfig;
use super::logging::LoggingConfig;
use super::session::SessionStoreConfig;

/// Environment variables with this prefix override file values,
/// e.g. `SIMGATE_API__BASE_URL`.
pub const ENV_PREFIX: &str = "SIMGATE_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionStoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file '{0}' does not exist")]
    NotFound(String),
    #[error("error loading configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigV1 {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        if self.api.timeout_in_ms == 0 {
            return Err(ConfigError::Invalid(
                "api.timeout_in_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Load config from a YAML file, then apply `SIMGATE_` environment overrides.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigV1, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    extract(Figment::new().merge(Yaml::file(path)))
}

/// Load config from an in-memory YAML document, then apply environment overrides.
pub fn load_config_from_str(yaml: &str) -> Result<ConfigV1, ConfigError> {
    extract(Figment::new().merge(Yaml::string(yaml)))
}

fn extract(figment: Figment) -> Result<ConfigV1, ConfigError> {
    let figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
    let config = match figment.extract::<Config>().map_err(Box::new)? {
        Config::ConfigV1(c) => c,
    };
    config.validate()?;
    Ok(config)
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
