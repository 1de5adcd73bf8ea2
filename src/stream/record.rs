//! Change-feed notification shapes.
//!
//! Mirrors the storage engine's stream format: a batch of records, each with
//! an `eventName` and a `dynamodb` payload holding the wire-tagged key and
//! before/after images.

use serde::{Deserialize, Serialize};

use crate::codec::Image;

/// Event source reported on records produced by this crate.
pub const EVENT_SOURCE: &str = "aws:dynamodb";

/// Mutation kind of a change-feed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Insert,
    Modify,
    Remove,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Insert => "INSERT",
            EventKind::Modify => "MODIFY",
            EventKind::Remove => "REMOVE",
        }
    }

    /// Parse a wire event name; unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "INSERT" => Some(EventKind::Insert),
            "MODIFY" => Some(EventKind::Modify),
            "REMOVE" => Some(EventKind::Remove),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key and images of a single change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_image: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_view_type: Option<String>,
}

/// One change-feed notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    #[serde(rename = "eventID", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_source: Option<String>,
    #[serde(default)]
    pub dynamodb: StreamPayload,
}

impl StreamRecord {
    /// Build a record carrying both images as the engine's
    /// `NEW_AND_OLD_IMAGES` view does.
    pub fn new(kind: EventKind, keys: Image, old: Option<Image>, new: Option<Image>) -> Self {
        Self {
            event_id: None,
            event_name: kind.as_str().to_string(),
            event_source: Some(EVENT_SOURCE.to_string()),
            dynamodb: StreamPayload {
                keys: Some(keys),
                new_image: new,
                old_image: old,
                sequence_number: None,
                stream_view_type: Some("NEW_AND_OLD_IMAGES".to_string()),
            },
        }
    }

    /// Stamp the record with its position in the feed.
    pub fn with_sequence(mut self, seq: u64) -> Self {
        self.event_id = Some(format!("{seq:032x}"));
        self.dynamodb.sequence_number = Some(format!("{seq:021}"));
        self
    }

    /// Parsed event kind, `None` for names outside INSERT/MODIFY/REMOVE.
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event_name)
    }
}

/// A delivered batch of change-feed records.
///
/// Records stay as raw JSON until the reactor parses each one inside its
/// own failure boundary, so one unparseable record cannot sink the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<serde_json::Value>,
}

impl StreamBatch {
    pub fn from_records(records: &[StreamRecord]) -> serde_json::Result<Self> {
        let records = records
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
