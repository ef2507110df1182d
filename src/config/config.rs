use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::http::{HttpConfig, SessionConfig};
use super::logging::LoggingConfig;
use super::storage::StorageConfig;

/// Environment variable that overrides the location of the YAML config file.
pub const CONFIG_PATH_ENV: &str = "TRACEEXPRESS_CONFIG";
/// Prefix for environment overrides, e.g. `TRACEEXPRESS_HTTP__BASE_URL`.
pub const ENV_PREFIX: &str = "TRACEEXPRESS_";
const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: backend location, session endpoints, token storage and logging.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub http: HttpConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Unwraps the versioned envelope.
    pub fn into_current(self) -> ConfigV1 {
        match self {
            Config::ConfigV1(c) => c,
        }
        // handle configuration migration between versions here when necessary
    }
}

/// Builds the figment used by `load_config`: the YAML file, then prefixed env vars on top.
pub fn figment(path: &str) -> Figment {
    Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load config from `$TRACEEXPRESS_CONFIG`, or "config.yaml" in the current directory.
pub fn load_config() -> ConfigV1 {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = match figment(&path).extract::<Config>() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration from '{}': {}", path, e);
            std::process::exit(1);
        }
    };
    config.into_current()
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    match serde_json::to_string_pretty(&schema) {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => eprintln!("Failed to render configuration schema: {}", e),
    }
}
