//! TableStore trait definition.

use async_trait::async_trait;

use super::{IndexQuery, Result, TableKey, WriteInstruction};
use crate::codec::AttributeMap;

/// Interface to the single-table storage engine.
///
/// Items are addressed by a two-part key `(PK, SK)`. The engine maintains
/// one secondary index on `EntityType`, ordered by `CreatedAt`, which is
/// eventually consistent with the primary items.
///
/// Every mutation is atomic at the single-item level. Implementations do
/// not retry; a transient failure surfaces as [`super::StorageError::Unavailable`].
///
/// Implementations:
/// - `DynamoTableStore`: DynamoDB table (feature `dynamo`)
/// - `MockTableStore`: In-memory table with change-feed capture
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Fetch the item stored under `key`.
    ///
    /// Returns `None` if no item exists.
    async fn get(&self, key: &TableKey) -> Result<Option<AttributeMap>>;

    /// Write an item unconditionally, replacing any item with the same key.
    ///
    /// The item must carry its own `PK` and `SK` attributes.
    async fn put(&self, item: AttributeMap) -> Result<()>;

    /// Apply a write instruction to an existing item.
    ///
    /// Conditional on the item existing: fails with
    /// [`super::StorageError::ConditionFailed`] otherwise. Returns the item
    /// as it is after the update.
    async fn update(&self, key: &TableKey, instruction: &WriteInstruction)
        -> Result<AttributeMap>;

    /// Delete an existing item.
    ///
    /// Conditional on the item existing: fails with
    /// [`super::StorageError::ConditionFailed`] otherwise.
    async fn delete(&self, key: &TableKey) -> Result<()>;

    /// Query the `EntityType` index.
    async fn query_index(&self, query: &IndexQuery) -> Result<Vec<AttributeMap>>;

    /// Check that the engine is reachable.
    async fn health(&self) -> Result<()>;
}
