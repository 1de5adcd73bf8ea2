//! Storage configuration types.

use serde::Deserialize;

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// In-memory table with change-feed capture.
    #[default]
    Memory,
    /// DynamoDB table (feature `dynamo`).
    Dynamo,
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// DynamoDB-specific configuration.
    pub dynamo: DynamoConfig,
}

/// DynamoDB-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DynamoConfig {
    /// Table name. Required when `type: dynamo`.
    pub table_name: String,
    /// Secondary index keyed by `EntityType`, sorted by `CreatedAt`.
    pub index_name: String,
    /// Endpoint override, e.g. DynamoDB Local.
    pub endpoint_url: Option<String>,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            index_name: "EntityTypeIndex".to_string(),
            endpoint_url: None,
        }
    }
}
