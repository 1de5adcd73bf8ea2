//! Write instructions for partial item updates.
//!
//! A [`WriteInstruction`] is a list of `SET` assignments. Each attribute is
//! referenced through a `#name` alias and each value through a `:name`
//! token, since attribute names such as `Name` and `Status` are reserved
//! words in the engine's expression language.

use std::collections::HashMap;

use crate::codec::{AttributeMap, Value};

/// One `SET #alias = :token` assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Stored attribute name, e.g. `Status`.
    pub attribute: String,
    /// Placeholder name without the `#`/`:` sigil, e.g. `status`.
    pub placeholder: String,
    pub value: Value,
}

impl Assignment {
    pub fn new(attribute: impl Into<String>, placeholder: impl Into<String>, value: Value) -> Self {
        Self {
            attribute: attribute.into(),
            placeholder: placeholder.into(),
            value,
        }
    }

    pub fn name_alias(&self) -> String {
        format!("#{}", self.placeholder)
    }

    pub fn value_token(&self) -> String {
        format!(":{}", self.placeholder)
    }
}

/// A partial update: the attributes to set, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteInstruction {
    assignments: Vec<Assignment>,
}

impl WriteInstruction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an assignment, replacing an earlier one for the same attribute.
    pub fn set(&mut self, assignment: Assignment) {
        match self
            .assignments
            .iter_mut()
            .find(|a| a.attribute == assignment.attribute)
        {
            Some(existing) => *existing = assignment,
            None => self.assignments.push(assignment),
        }
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Whether the instruction assigns `attribute`.
    pub fn touches(&self, attribute: &str) -> bool {
        self.assignments.iter().any(|a| a.attribute == attribute)
    }

    /// Render the update expression, e.g. `SET #name = :name, #updated_at = :updated_at`.
    pub fn expression(&self) -> String {
        let parts: Vec<String> = self
            .assignments
            .iter()
            .map(|a| format!("{} = {}", a.name_alias(), a.value_token()))
            .collect();
        format!("SET {}", parts.join(", "))
    }

    /// Alias → attribute name map for the expression.
    pub fn attribute_names(&self) -> HashMap<String, String> {
        self.assignments
            .iter()
            .map(|a| (a.name_alias(), a.attribute.clone()))
            .collect()
    }

    /// Token → value map for the expression.
    pub fn attribute_values(&self) -> HashMap<String, Value> {
        self.assignments
            .iter()
            .map(|a| (a.value_token(), a.value.clone()))
            .collect()
    }

    /// Apply the assignments to an in-memory item.
    pub fn apply_to(&self, item: &mut AttributeMap) {
        for assignment in &self.assignments {
            item.insert(assignment.attribute.clone(), assignment.value.clone());
        }
    }
}
