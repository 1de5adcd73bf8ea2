//! Update-expression builder.
//!
//! Partial updates are modelled as a list of [`ItemChange`] variants, one per
//! mutable field. The builder folds them into a [`WriteInstruction`] and
//! always appends the `UpdatedAt` stamp. Fields outside the mutable set
//! cannot be expressed, so keys, `EntityType`, `ItemId` and `CreatedAt` are
//! never touched.

use serde::Deserialize;

use super::item::{ATTR_DESCRIPTION, ATTR_NAME, ATTR_STATUS, ATTR_UPDATED_AT};
use crate::codec::Value;
use crate::storage::{Assignment, WriteInstruction};

/// A change to one mutable item field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemChange {
    Name(String),
    Description(String),
    Status(String),
}

impl ItemChange {
    /// Stored attribute name.
    pub fn attribute(&self) -> &'static str {
        match self {
            ItemChange::Name(_) => ATTR_NAME,
            ItemChange::Description(_) => ATTR_DESCRIPTION,
            ItemChange::Status(_) => ATTR_STATUS,
        }
    }

    /// Expression placeholder, as used in `#name` / `:name`.
    pub fn placeholder(&self) -> &'static str {
        match self {
            ItemChange::Name(_) => "name",
            ItemChange::Description(_) => "description",
            ItemChange::Status(_) => "status",
        }
    }

    fn into_assignment(self) -> Assignment {
        let (attribute, placeholder) = (self.attribute(), self.placeholder());
        let value = match self {
            ItemChange::Name(v) | ItemChange::Description(v) | ItemChange::Status(v) => v,
        };
        Assignment::new(attribute, placeholder, Value::from(value))
    }
}

/// Request body of a partial update.
///
/// Only the mutable fields are read; anything else in the body (`id`,
/// `createdAt`, raw attribute names) is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

impl ItemPatch {
    pub fn changes(self) -> Vec<ItemChange> {
        let mut changes = Vec::new();
        if let Some(name) = self.name {
            changes.push(ItemChange::Name(name));
        }
        if let Some(description) = self.description {
            changes.push(ItemChange::Description(description));
        }
        if let Some(status) = self.status {
            changes.push(ItemChange::Status(status));
        }
        changes
    }
}

/// Folds item changes into a write instruction.
#[derive(Debug, Clone, Default)]
pub struct UpdateBuilder {
    instruction: WriteInstruction,
}

impl UpdateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn change(mut self, change: ItemChange) -> Self {
        self.instruction.set(change.into_assignment());
        self
    }

    pub fn changes(self, changes: impl IntoIterator<Item = ItemChange>) -> Self {
        changes.into_iter().fold(self, Self::change)
    }

    /// Finish the instruction, stamping `UpdatedAt = updated_at`.
    pub fn build(mut self, updated_at: i64) -> WriteInstruction {
        self.instruction.set(Assignment::new(
            ATTR_UPDATED_AT,
            "updated_at",
            Value::from(updated_at),
        ));
        self.instruction
    }
}
