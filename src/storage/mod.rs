//! Storage engine access.
//!
//! The table itself is an external collaborator. This module defines the
//! contract the rest of the crate relies on ([`TableStore`]) and provides
//! an in-memory engine for local use and tests plus a DynamoDB adapter.

use std::sync::Arc;

use tracing::info;

use crate::codec::CodecError;
use crate::config::{StorageConfig, StorageType};

pub mod mock;
mod table_store;
mod write;

#[cfg(feature = "dynamo")]
pub mod dynamo;

pub use mock::MockTableStore;
pub use table_store::TableStore;
pub use write::{Assignment, WriteInstruction};

#[cfg(feature = "dynamo")]
pub use dynamo::DynamoTableStore;

/// Partition key attribute.
pub const PARTITION_KEY_ATTR: &str = "PK";
/// Sort key attribute.
pub const SORT_KEY_ATTR: &str = "SK";
/// Partition attribute of the secondary index.
pub const INDEX_PARTITION_ATTR: &str = "EntityType";
/// Sort attribute of the secondary index.
pub const INDEX_SORT_ATTR: &str = "CreatedAt";

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage engine unavailable: {0}")]
    Unavailable(String),

    #[error("Conditional check failed: item does not exist")]
    ConditionFailed,

    #[error("Item is missing key attribute {0}")]
    MissingKey(&'static str),

    #[error("Stored item could not be decoded: {0}")]
    Codec(#[from] CodecError),

    #[error("Storage configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Primary key of a stored item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    pub pk: String,
    pub sk: String,
}

impl TableKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

impl std::fmt::Display for TableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pk, self.sk)
    }
}

/// Query against the `EntityType` index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    /// Value of the `EntityType` discriminator.
    pub entity_type: String,
    /// Maximum number of items to return.
    pub limit: usize,
    /// Order by `CreatedAt` descending when true.
    pub newest_first: bool,
}

impl IndexQuery {
    /// Newest-first query for `entity_type`, capped at `limit`.
    pub fn newest(entity_type: impl Into<String>, limit: usize) -> Self {
        Self {
            entity_type: entity_type.into(),
            limit,
            newest_first: true,
        }
    }
}

/// Initialize the storage engine based on configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Arc<dyn TableStore>> {
    match config.storage_type {
        StorageType::Memory => {
            info!("Storage: in-memory table");
            Ok(Arc::new(MockTableStore::new()))
        }
        #[cfg(feature = "dynamo")]
        StorageType::Dynamo => {
            let dynamo = &config.dynamo;
            info!(
                table = %dynamo.table_name,
                index = %dynamo.index_name,
                "Storage: DynamoDB"
            );
            let store = DynamoTableStore::new(
                dynamo.table_name.clone(),
                dynamo.index_name.clone(),
                dynamo.endpoint_url.as_deref(),
            )
            .await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "dynamo"))]
        StorageType::Dynamo => {
            tracing::error!("DynamoDB storage requested but 'dynamo' feature is not enabled");
            Err(StorageError::Configuration(
                "DynamoDB feature not enabled".to_string(),
            ))
        }
    }
}
