//! Event classification and per-entity-type dispatch.
//!
//! Each record is classified by its event kind, its images are decoded, and
//! the handler registered for its `EntityType` is invoked. Unknown event
//! kinds are skipped; unknown entity types succeed without side effects.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::diff::{diff, FieldDiff};
use super::notifier::{Notice, Notifier, NotifyError};
use super::record::{EventKind, StreamRecord};
use crate::codec::{decode_image, AttributeMap, CodecError, Value};
use crate::metrics::{self, Metrics};
use crate::store::item::{ATTR_ENTITY_TYPE, ATTR_ITEM_ID, ATTR_NAME, ATTR_STATUS, ATTR_UPDATED_AT};
use crate::store::{EntityType, STATUS_INACTIVE};

/// Attributes every mutation rewrites; not reported as changed fields.
pub const BOOKKEEPING_ATTRIBUTES: [&str; 1] = [ATTR_UPDATED_AT];

/// Per-record dispatch failures.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid stream record: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Outcome of one record, as reported in the batch summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RecordOutcome {
    Success {
        event_type: String,
        entity_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        changed_fields: Option<Vec<String>>,
    },
    Skipped {
        event_type: String,
    },
    Failed {
        error: String,
    },
}

impl RecordOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, RecordOutcome::Failed { .. })
    }
}

/// Side effects for one entity type.
///
/// Every hook defaults to a no-op.
#[async_trait]
pub trait EntityHandler: Send + Sync {
    async fn on_inserted(&self, _after: &AttributeMap) -> Result<()> {
        Ok(())
    }

    async fn on_modified(
        &self,
        _before: &AttributeMap,
        _after: &AttributeMap,
        _diff: &FieldDiff,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_removed(&self, _before: &AttributeMap) -> Result<()> {
        Ok(())
    }
}

/// Known entity types mapped to their handlers.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<EntityType, Arc<dyn EntityHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, entity_type: EntityType, handler: Arc<dyn EntityHandler>) -> Self {
        self.handlers.insert(entity_type, handler);
        self
    }

    /// Handler for a stored discriminator, if the type is known and registered.
    pub fn resolve(&self, discriminator: Option<&str>) -> Option<&Arc<dyn EntityHandler>> {
        let entity_type = EntityType::parse(discriminator?)?;
        self.handlers.get(&entity_type)
    }
}

/// Classifies records and routes them to entity handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: HandlerRegistry,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Parse a raw record, then dispatch it.
    pub async fn dispatch_raw(&self, raw: &serde_json::Value) -> Result<RecordOutcome> {
        let record = StreamRecord::deserialize(raw)?;
        self.dispatch(&record).await
    }

    pub async fn dispatch(&self, record: &StreamRecord) -> Result<RecordOutcome> {
        let Some(kind) = record.kind() else {
            warn!(event_type = %record.event_name, "Unknown event type");
            return Ok(RecordOutcome::Skipped {
                event_type: record.event_name.clone(),
            });
        };
        info!(event_type = %kind, event_id = ?record.event_id, "Processing event");

        let payload = &record.dynamodb;
        match kind {
            EventKind::Insert => {
                let after = decode_image(payload.new_image.as_ref())?;
                debug!(image = ?after, "INSERT image");
                let entity_type = entity_type_of(&after);
                if let Some(handler) = self.registry.resolve(entity_type.as_deref()) {
                    handler.on_inserted(&after).await?;
                }
                Ok(success(kind, entity_type, None))
            }
            EventKind::Modify => {
                let before = decode_image(payload.old_image.as_ref())?;
                let after = decode_image(payload.new_image.as_ref())?;
                debug!(old = ?before, new = ?after, "MODIFY images");

                let changes = diff(&before, &after).without(&BOOKKEEPING_ATTRIBUTES);
                for change in changes.changes() {
                    debug!(field = %change.field, old = ?change.old, new = %change.new, "Field changed");
                }

                let entity_type = entity_type_of(&after);
                if let Some(handler) = self.registry.resolve(entity_type.as_deref()) {
                    handler.on_modified(&before, &after, &changes).await?;
                }
                Ok(success(kind, entity_type, Some(changes.changed_fields())))
            }
            EventKind::Remove => {
                let before = decode_image(payload.old_image.as_ref())?;
                debug!(image = ?before, "REMOVE image");
                let entity_type = entity_type_of(&before);
                if let Some(handler) = self.registry.resolve(entity_type.as_deref()) {
                    handler.on_removed(&before).await?;
                }
                Ok(success(kind, entity_type, None))
            }
        }
    }
}

fn success(
    kind: EventKind,
    entity_type: Option<String>,
    changed_fields: Option<Vec<String>>,
) -> RecordOutcome {
    RecordOutcome::Success {
        event_type: kind.as_str().to_string(),
        entity_type,
        changed_fields,
    }
}

fn string_attr(image: &AttributeMap, name: &str) -> Option<String> {
    image.get(name).and_then(Value::as_str).map(str::to_string)
}

fn entity_type_of(image: &AttributeMap) -> Option<String> {
    string_attr(image, ATTR_ENTITY_TYPE)
}

/// Side effects of `Item` changes: lifecycle counters and notices.
pub struct ItemHandler {
    metrics: Metrics,
    notifier: Arc<dyn Notifier>,
}

impl ItemHandler {
    pub fn new(metrics: Metrics, notifier: Arc<dyn Notifier>) -> Self {
        Self { metrics, notifier }
    }

    fn item_id(image: &AttributeMap) -> String {
        string_attr(image, ATTR_ITEM_ID).unwrap_or_default()
    }
}

#[async_trait]
impl EntityHandler for ItemHandler {
    async fn on_inserted(&self, after: &AttributeMap) -> Result<()> {
        let item_id = Self::item_id(after);
        info!(item_id = %item_id, "New item created");
        self.metrics.count(metrics::ITEMS_CREATED, 1).await;
        self.notifier
            .notify(Notice::Created {
                item_id,
                name: string_attr(after, ATTR_NAME),
            })
            .await?;
        Ok(())
    }

    async fn on_modified(
        &self,
        _before: &AttributeMap,
        after: &AttributeMap,
        diff: &FieldDiff,
    ) -> Result<()> {
        let item_id = Self::item_id(after);
        info!(item_id = %item_id, changed_fields = ?diff.changed_fields(), "Item updated");
        self.metrics.count(metrics::ITEMS_MODIFIED, 1).await;

        let Some(status) = diff.get(ATTR_STATUS) else {
            return Ok(());
        };
        let previous_status = status.old.as_ref().and_then(Value::as_str).map(str::to_string);
        info!(item_id = %item_id, old = ?previous_status, new = %status.new, "Status changed");

        if status.new.as_str() == Some(STATUS_INACTIVE) {
            info!(item_id = %item_id, "Item deactivated");
            self.metrics.count(metrics::ITEMS_DEACTIVATED, 1).await;
            self.notifier
                .notify(Notice::Deactivated {
                    item_id,
                    previous_status,
                })
                .await?;
        }
        Ok(())
    }

    async fn on_removed(&self, before: &AttributeMap) -> Result<()> {
        let item_id = Self::item_id(before);
        info!(item_id = %item_id, "Item deleted");
        self.metrics.count(metrics::ITEMS_DELETED, 1).await;
        self.notifier.notify(Notice::Removed { item_id }).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
