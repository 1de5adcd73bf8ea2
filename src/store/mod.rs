//! Entity store.
//!
//! Owns the single-table key conventions and exposes list/get/create/
//! update/delete over a [`TableStore`]. Every operation maps onto one
//! atomic engine call (plus a lookup for update); failures come back
//! classified as [`StoreError`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::codec::{AttributeMap, CodecError};
use crate::storage::{IndexQuery, StorageError, TableStore};
use crate::utils::clock::Clock;

pub mod item;
pub mod update;

pub use item::{EntityType, Item, NewItem, STATUS_ACTIVE, STATUS_INACTIVE};
pub use update::{ItemChange, ItemPatch, UpdateBuilder};

/// Page size when the caller supplies none.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Classified entity store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: EntityType, id: String },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Malformed stored item: {0}")]
    Malformed(CodecError),

    #[error("Storage error: {0}")]
    Upstream(StorageError),
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Codec(e) => StoreError::Malformed(e),
            other => StoreError::Upstream(other),
        }
    }
}

impl From<CodecError> for StoreError {
    fn from(err: CodecError) -> Self {
        StoreError::Malformed(err)
    }
}

impl StoreError {
    fn not_found(entity_type: EntityType, id: &str) -> Self {
        StoreError::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Result code of the request surface.
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::NotFound { .. } => 404,
            StoreError::InvalidArgument(_) => 400,
            StoreError::Upstream(StorageError::Unavailable(_)) => 503,
            StoreError::Malformed(_) | StoreError::Upstream(_) => 500,
        }
    }

    /// Short error label of the response body.
    pub fn error_label(&self) -> &'static str {
        match self.status_code() {
            404 => "Not found",
            400 => "Bad request",
            503 => "Service unavailable",
            _ => "Internal server error",
        }
    }

    /// Whether the failure is the caller's to fix.
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Result of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub items: Vec<Item>,
    pub count: usize,
}

/// Entity store over one table.
#[derive(Clone)]
pub struct EntityStore {
    table: Arc<dyn TableStore>,
    clock: Arc<dyn Clock>,
    default_limit: usize,
}

impl EntityStore {
    pub fn new(table: Arc<dyn TableStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            table,
            clock,
            default_limit: DEFAULT_LIST_LIMIT,
        }
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    pub fn table(&self) -> &Arc<dyn TableStore> {
        &self.table
    }

    /// Newest-first listing of one entity type, capped at `limit`.
    pub async fn list(&self, entity_type: EntityType, limit: Option<i64>) -> Result<Listing> {
        let limit = match limit {
            None => self.default_limit,
            Some(n) if n > 0 => usize::try_from(n)
                .map_err(|_| StoreError::InvalidArgument(format!("limit out of range: {n}")))?,
            Some(n) => {
                return Err(StoreError::InvalidArgument(format!(
                    "limit must be a positive integer, got {n}"
                )))
            }
        };

        let query = IndexQuery::newest(entity_type.as_str(), limit);
        let items = self
            .table
            .query_index(&query)
            .await?
            .iter()
            .map(Item::from_attributes)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(entity_type = %entity_type, limit, count = items.len(), "Listed items");
        Ok(Listing {
            count: items.len(),
            items,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Item> {
        let attributes = self.fetch(id).await?;
        Ok(Item::from_attributes(&attributes)?)
    }

    pub async fn create(&self, fields: NewItem) -> Result<Item> {
        let name = fields
            .name
            .ok_or_else(|| StoreError::InvalidArgument("name is required".to_string()))?;

        let now = self.clock.now();
        let item = Item {
            id: Uuid::new_v4().to_string(),
            name,
            description: fields.description.unwrap_or_default(),
            status: fields.status.unwrap_or_else(|| STATUS_ACTIVE.to_string()),
            created_at: now,
            updated_at: now,
        };

        self.table.put(item.to_attributes()).await?;
        info!(id = %item.id, "Created item");
        Ok(item)
    }

    /// Apply a partial update and return the post-update item.
    pub async fn update(&self, id: &str, patch: ItemPatch) -> Result<Item> {
        let existing = Item::from_attributes(&self.fetch(id).await?)?;

        let changes = patch.changes();
        if changes.is_empty() {
            return Err(StoreError::InvalidArgument("No fields to update".to_string()));
        }

        // Epoch seconds: two updates inside one second must still move forward.
        let updated_at = self.clock.now().max(existing.updated_at + 1);
        let instruction = UpdateBuilder::new().changes(changes).build(updated_at);

        let key = EntityType::Item.key(id);
        let attributes = self
            .table
            .update(&key, &instruction)
            .await
            .map_err(|e| self.classify(e, id))?;

        info!(id = %id, expression = %instruction.expression(), "Updated item");
        Ok(Item::from_attributes(&attributes)?)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let key = EntityType::Item.key(id);
        self.table
            .delete(&key)
            .await
            .map_err(|e| self.classify(e, id))?;
        info!(id = %id, "Deleted item");
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<AttributeMap> {
        self.table
            .get(&EntityType::Item.key(id))
            .await?
            .ok_or_else(|| StoreError::not_found(EntityType::Item, id))
    }

    fn classify(&self, err: StorageError, id: &str) -> StoreError {
        match err {
            StorageError::ConditionFailed => StoreError::not_found(EntityType::Item, id),
            other => other.into(),
        }
    }
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("default_limit", &self.default_limit)
            .finish_non_exhaustive()
    }
}
