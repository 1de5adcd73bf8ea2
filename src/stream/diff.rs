//! Field-level diff of before/after images.
//!
//! A field is changed when it is present in `after` and either absent from
//! `before` or present with a value that is not structurally equal. Fields
//! present only in `before` are not reported: a MODIFY always carries the
//! full after-image and nothing downstream inspects removed attributes.

use crate::codec::{AttributeMap, Value};

/// Old and new value of one changed field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    /// `None` when the field was added.
    pub old: Option<Value>,
    pub new: Value,
}

/// Result of comparing two images.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDiff {
    changes: Vec<FieldChange>,
}

impl FieldDiff {
    /// Changed field names, in after-image order.
    pub fn changed_fields(&self) -> Vec<String> {
        self.changes.iter().map(|c| c.field.clone()).collect()
    }

    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.field == field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Copy of this diff without the named fields.
    pub fn without(&self, fields: &[&str]) -> Self {
        Self {
            changes: self
                .changes
                .iter()
                .filter(|c| !fields.contains(&c.field.as_str()))
                .cloned()
                .collect(),
        }
    }
}

/// Compare `before` and `after`.
pub fn diff(before: &AttributeMap, after: &AttributeMap) -> FieldDiff {
    let changes = after
        .iter()
        .filter_map(|(field, new)| match before.get(field) {
            Some(old) if old == new => None,
            old => Some(FieldChange {
                field: field.clone(),
                old: old.cloned(),
                new: new.clone(),
            }),
        })
        .collect();

    FieldDiff { changes }
}
