//! Item records and key conventions.
//!
//! Every entity lives on a single item keyed `PK = {TYPE}#{id}`,
//! `SK = METADATA`. `EntityType` drives both the secondary index and the
//! change-feed dispatcher. `GSI1PK`/`GSI1SK` mirror the primary key and the
//! creation time for the listing projection.

use serde::{Deserialize, Serialize};

use crate::codec::{AttributeMap, CodecError, Value};
use crate::storage::{TableKey, PARTITION_KEY_ATTR, SORT_KEY_ATTR};

/// Fixed sort key of an entity's core attributes.
pub const METADATA_SORT_KEY: &str = "METADATA";

pub const ATTR_ENTITY_TYPE: &str = "EntityType";
pub const ATTR_ITEM_ID: &str = "ItemId";
pub const ATTR_NAME: &str = "Name";
pub const ATTR_DESCRIPTION: &str = "Description";
pub const ATTR_STATUS: &str = "Status";
pub const ATTR_CREATED_AT: &str = "CreatedAt";
pub const ATTR_UPDATED_AT: &str = "UpdatedAt";
pub const ATTR_GSI1_PK: &str = "GSI1PK";
pub const ATTR_GSI1_SK: &str = "GSI1SK";

/// Attributes no update may assign.
pub const IMMUTABLE_ATTRIBUTES: [&str; 7] = [
    PARTITION_KEY_ATTR,
    SORT_KEY_ATTR,
    ATTR_ENTITY_TYPE,
    ATTR_ITEM_ID,
    ATTR_CREATED_AT,
    ATTR_GSI1_PK,
    ATTR_GSI1_SK,
];

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";

/// Known entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Item,
}

impl EntityType {
    /// Discriminator stored in `EntityType`.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Item => "Item",
        }
    }

    /// Prefix of the partition key.
    pub fn key_prefix(self) -> &'static str {
        match self {
            EntityType::Item => "ITEM",
        }
    }

    /// Parse a stored discriminator; unknown values yield `None`.
    pub fn parse(discriminator: &str) -> Option<Self> {
        match discriminator {
            "Item" => Some(EntityType::Item),
            _ => None,
        }
    }

    pub fn partition_key(self, id: &str) -> String {
        format!("{}#{}", self.key_prefix(), id)
    }

    /// Primary key of the entity with `id`.
    pub fn key(self, id: &str) -> TableKey {
        TableKey::new(self.partition_key(id), METADATA_SORT_KEY)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Item {
    pub fn key(&self) -> TableKey {
        EntityType::Item.key(&self.id)
    }

    /// Full stored representation, including key and index attributes.
    pub fn to_attributes(&self) -> AttributeMap {
        let pk = EntityType::Item.partition_key(&self.id);
        AttributeMap::from([
            (PARTITION_KEY_ATTR.to_string(), Value::from(pk.clone())),
            (SORT_KEY_ATTR.to_string(), Value::from(METADATA_SORT_KEY)),
            (ATTR_ENTITY_TYPE.to_string(), Value::from(EntityType::Item.as_str())),
            (ATTR_ITEM_ID.to_string(), Value::from(self.id.clone())),
            (ATTR_NAME.to_string(), Value::from(self.name.clone())),
            (ATTR_DESCRIPTION.to_string(), Value::from(self.description.clone())),
            (ATTR_STATUS.to_string(), Value::from(self.status.clone())),
            (ATTR_CREATED_AT.to_string(), Value::from(self.created_at)),
            (ATTR_UPDATED_AT.to_string(), Value::from(self.updated_at)),
            (ATTR_GSI1_PK.to_string(), Value::from(pk)),
            (
                ATTR_GSI1_SK.to_string(),
                Value::from(format!("CREATED#{}", self.created_at)),
            ),
        ])
    }

    /// Read an item back from its stored attributes.
    pub fn from_attributes(attributes: &AttributeMap) -> Result<Self, CodecError> {
        Ok(Self {
            id: required_str(attributes, ATTR_ITEM_ID)?,
            name: required_str(attributes, ATTR_NAME)?,
            description: optional_str(attributes, ATTR_DESCRIPTION)?.unwrap_or_default(),
            status: optional_str(attributes, ATTR_STATUS)?
                .unwrap_or_else(|| STATUS_ACTIVE.to_string()),
            created_at: required_i64(attributes, ATTR_CREATED_AT)?,
            updated_at: required_i64(attributes, ATTR_UPDATED_AT)?,
        })
    }
}

fn optional_str(attributes: &AttributeMap, name: &str) -> Result<Option<String>, CodecError> {
    match attributes.get(name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(CodecError::MalformedAttribute(format!(
            "{name}: expected string, found {}",
            other.kind()
        ))),
    }
}

fn required_str(attributes: &AttributeMap, name: &str) -> Result<String, CodecError> {
    optional_str(attributes, name)?
        .ok_or_else(|| CodecError::MalformedAttribute(format!("{name}: missing")))
}

fn required_i64(attributes: &AttributeMap, name: &str) -> Result<i64, CodecError> {
    let value = attributes
        .get(name)
        .ok_or_else(|| CodecError::MalformedAttribute(format!("{name}: missing")))?;
    value.as_i64().ok_or_else(|| {
        CodecError::MalformedAttribute(format!("{name}: expected integer, found {value}"))
    })
}

/// Input of item creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewItem {
    /// Required.
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

impl NewItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}
