use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where session credentials live between runs.
/// We differentiate the backends via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(tag = "type")]
pub enum SessionStoreConfig {
    /// Credentials are dropped when the process exits.
    #[default]
    #[serde(rename = "memory")]
    Memory,
    /// Credentials are persisted as JSON at `path`.
    #[serde(rename = "file")]
    File(FileStoreConfig),
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
pub struct FileStoreConfig {
    pub path: String,
}
