use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the access token lives between requests (and, for `file`, between runs).
/// We differentiate the backends via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(tag = "type")]
pub enum StorageConfig {
    #[serde(rename = "memory")]
    Memory {
        #[serde(default = "default_token_key")]
        key: String,
    },
    #[serde(rename = "file")]
    File {
        path: String,
        #[serde(default = "default_token_key")]
        key: String,
    },
}

impl StorageConfig {
    /// The storage key holding the access token.
    pub fn key(&self) -> &str {
        match self {
            StorageConfig::Memory { key } | StorageConfig::File { key, .. } => key,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory {
            key: default_token_key(),
        }
    }
}

pub fn default_token_key() -> String {
    "userToken".to_string()
}
