//! In-memory storage engine.
//!
//! Behaves like the real table for everything the crate relies on: a
//! primary-key map, a sparse `EntityType` index ordered by `CreatedAt`,
//! conditional update/delete, and a change feed. Every committed mutation
//! appends a [`StreamRecord`] carrying wire-encoded before/after images, so
//! the full request → change feed → reactor pipeline runs without a cloud
//! table.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    IndexQuery, Result, StorageError, TableKey, TableStore, WriteInstruction,
    INDEX_PARTITION_ATTR, INDEX_SORT_ATTR, PARTITION_KEY_ATTR, SORT_KEY_ATTR,
};
use crate::codec::{encode_map, AttributeMap, Image, Value, WireValue};
use crate::stream::{EventKind, StreamRecord};

/// Stored item with its insertion sequence (index tie-breaker).
#[derive(Debug, Clone)]
struct StoredItem {
    attributes: AttributeMap,
    seq: u64,
}

/// In-memory table that records its own change feed.
#[derive(Default)]
pub struct MockTableStore {
    items: RwLock<HashMap<TableKey, StoredItem>>,
    feed: RwLock<Vec<StreamRecord>>,
    next_seq: AtomicU64,
    fail_on_read: RwLock<bool>,
    fail_on_write: RwLock<bool>,
}

impl MockTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read (get, query, health) fail as unavailable.
    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    /// Make every write (put, update, delete) fail as unavailable.
    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Snapshot of the change feed recorded so far.
    pub async fn change_feed(&self) -> Vec<StreamRecord> {
        self.feed.read().await.clone()
    }

    /// Drain the change feed recorded so far.
    pub async fn take_change_feed(&self) -> Vec<StreamRecord> {
        std::mem::take(&mut *self.feed.write().await)
    }

    async fn check_read(&self) -> Result<()> {
        if *self.fail_on_read.read().await {
            return Err(StorageError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }

    async fn check_write(&self) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StorageError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }

    async fn record(
        &self,
        kind: EventKind,
        key: &TableKey,
        old: Option<&AttributeMap>,
        new: Option<&AttributeMap>,
    ) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let record = StreamRecord::new(
            kind,
            key_image(key),
            old.map(encode_map),
            new.map(encode_map),
        )
        .with_sequence(seq);

        debug!(kind = kind.as_str(), key = %key, "Recorded change");
        self.feed.write().await.push(record);
    }
}

/// Wire image of a primary key, as carried in change-feed `Keys`.
fn key_image(key: &TableKey) -> Image {
    let mut image = Image::new();
    image.insert(PARTITION_KEY_ATTR.to_string(), WireValue::string(&key.pk));
    image.insert(SORT_KEY_ATTR.to_string(), WireValue::string(&key.sk));
    image
}

/// Extract the primary key from an item's own attributes.
fn key_of(item: &AttributeMap) -> Result<TableKey> {
    let pk = item
        .get(PARTITION_KEY_ATTR)
        .and_then(Value::as_str)
        .ok_or(StorageError::MissingKey(PARTITION_KEY_ATTR))?;
    let sk = item
        .get(SORT_KEY_ATTR)
        .and_then(Value::as_str)
        .ok_or(StorageError::MissingKey(SORT_KEY_ATTR))?;
    Ok(TableKey::new(pk, sk))
}

/// Index membership: items lacking either index attribute are not projected.
fn index_entry<'a>(stored: &'a StoredItem, entity_type: &str) -> Option<(Decimal, u64, &'a AttributeMap)> {
    let attributes = &stored.attributes;
    if attributes.get(INDEX_PARTITION_ATTR).and_then(Value::as_str) != Some(entity_type) {
        return None;
    }
    let created_at = attributes.get(INDEX_SORT_ATTR).and_then(Value::as_decimal)?;
    Some((created_at, stored.seq, attributes))
}

#[async_trait]
impl TableStore for MockTableStore {
    async fn get(&self, key: &TableKey) -> Result<Option<AttributeMap>> {
        self.check_read().await?;
        let items = self.items.read().await;
        Ok(items.get(key).map(|stored| stored.attributes.clone()))
    }

    async fn put(&self, item: AttributeMap) -> Result<()> {
        self.check_write().await?;
        let key = key_of(&item)?;

        // The feed entry is appended under the items guard so the feed
        // order matches the commit order.
        let mut items = self.items.write().await;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let previous = items.insert(
            key.clone(),
            StoredItem {
                attributes: item.clone(),
                seq,
            },
        );

        match previous {
            Some(old) => {
                self.record(EventKind::Modify, &key, Some(&old.attributes), Some(&item))
                    .await
            }
            None => self.record(EventKind::Insert, &key, None, Some(&item)).await,
        }
        Ok(())
    }

    async fn update(
        &self,
        key: &TableKey,
        instruction: &WriteInstruction,
    ) -> Result<AttributeMap> {
        self.check_write().await?;

        let mut items = self.items.write().await;
        let stored = items.get_mut(key).ok_or(StorageError::ConditionFailed)?;
        let old = stored.attributes.clone();
        instruction.apply_to(&mut stored.attributes);
        let new = stored.attributes.clone();

        self.record(EventKind::Modify, key, Some(&old), Some(&new)).await;
        Ok(new)
    }

    async fn delete(&self, key: &TableKey) -> Result<()> {
        self.check_write().await?;

        let mut items = self.items.write().await;
        let removed = items.remove(key).ok_or(StorageError::ConditionFailed)?;

        self.record(EventKind::Remove, key, Some(&removed.attributes), None)
            .await;
        Ok(())
    }

    async fn query_index(&self, query: &IndexQuery) -> Result<Vec<AttributeMap>> {
        self.check_read().await?;
        let items = self.items.read().await;

        let mut entries: Vec<_> = items
            .values()
            .filter_map(|stored| index_entry(stored, &query.entity_type))
            .collect();

        if query.newest_first {
            entries.sort_by_key(|(created_at, seq, _)| Reverse((*created_at, *seq)));
        } else {
            entries.sort_by_key(|(created_at, seq, _)| (*created_at, *seq));
        }

        Ok(entries
            .into_iter()
            .take(query.limit)
            .map(|(_, _, attributes)| attributes.clone())
            .collect())
    }

    async fn health(&self) -> Result<()> {
        self.check_read().await
    }
}

#[cfg(test)]
mod tests;
