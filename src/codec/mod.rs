//! Attribute codec.
//!
//! Converts the change feed's tagged wire representation into typed values.
//! A wire value is a single-key union: exactly one of `S`, `N`, `BOOL`, `M`,
//! `L` or `NULL` is present. Numbers decode to [`Decimal`] so monetary and
//! counter fields never pass through a binary float.

use std::str::FromStr;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decoded attributes of a single record, in the order they were given.
///
/// Equality is structural: two maps with the same entries compare equal
/// regardless of entry order.
pub type AttributeMap = IndexMap<String, Value>;

/// Wire-tagged attributes of a single record (a before or after image).
pub type Image = IndexMap<String, WireValue>;

/// Errors raised while decoding wire values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Malformed attribute: {0}")]
    MalformedAttribute(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(Decimal),
    Bool(bool),
    Null,
    Map(AttributeMap),
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Integer view of a number, if it has no fractional part and fits in `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        use rust_decimal::prelude::ToPrimitive;

        let n = self.as_decimal()?;
        if n.fract().is_zero() {
            n.to_i64()
        } else {
            None
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Map(_) => "map",
            Value::List(_) => "list",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => f.write_str("null"),
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Value::List(items) => {
                f.write_str("[")?;
                for (i, value) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A wire-tagged attribute value as carried by change-feed notifications.
///
/// Every tag is optional so that zero-tag and multi-tag values still
/// deserialize; [`decode`] is where they are rejected. Tags this codec does
/// not understand (binary, sets) are kept in `other` for the same reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireValue {
    #[serde(rename = "S", default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(rename = "BOOL", default, skip_serializing_if = "Option::is_none")]
    pub bool: Option<bool>,
    #[serde(rename = "M", default, skip_serializing_if = "Option::is_none")]
    pub m: Option<Image>,
    #[serde(rename = "L", default, skip_serializing_if = "Option::is_none")]
    pub l: Option<Vec<WireValue>>,
    #[serde(rename = "NULL", default, skip_serializing_if = "Option::is_none")]
    pub null: Option<bool>,
    #[serde(flatten)]
    pub other: IndexMap<String, serde_json::Value>,
}

impl WireValue {
    pub fn string(s: impl Into<String>) -> Self {
        Self {
            s: Some(s.into()),
            ..Self::default()
        }
    }

    pub fn number(n: impl ToString) -> Self {
        Self {
            n: Some(n.to_string()),
            ..Self::default()
        }
    }

    pub fn boolean(b: bool) -> Self {
        Self {
            bool: Some(b),
            ..Self::default()
        }
    }

    pub fn null() -> Self {
        Self {
            null: Some(true),
            ..Self::default()
        }
    }

    pub fn map(m: Image) -> Self {
        Self {
            m: Some(m),
            ..Self::default()
        }
    }

    pub fn list(l: Vec<WireValue>) -> Self {
        Self {
            l: Some(l),
            ..Self::default()
        }
    }

    /// Names of every tag present on this value.
    fn tags(&self) -> Vec<&str> {
        let mut tags = Vec::new();
        if self.s.is_some() {
            tags.push("S");
        }
        if self.n.is_some() {
            tags.push("N");
        }
        if self.bool.is_some() {
            tags.push("BOOL");
        }
        if self.m.is_some() {
            tags.push("M");
        }
        if self.l.is_some() {
            tags.push("L");
        }
        if self.null.is_some() {
            tags.push("NULL");
        }
        tags.extend(self.other.keys().map(String::as_str));
        tags
    }
}

/// Decode a single wire value.
///
/// Fails with [`CodecError::MalformedAttribute`] when the value carries zero
/// tags, more than one tag, an unsupported tag, or an unparseable number.
pub fn decode(wire: &WireValue) -> Result<Value> {
    let tags = wire.tags();
    if tags.len() != 1 {
        return Err(CodecError::MalformedAttribute(format!(
            "expected exactly one type tag, found {} ({})",
            tags.len(),
            tags.join(", ")
        )));
    }

    if let Some(s) = &wire.s {
        return Ok(Value::String(s.clone()));
    }
    if let Some(n) = &wire.n {
        return parse_number(n).map(Value::Number);
    }
    if let Some(b) = wire.bool {
        return Ok(Value::Bool(b));
    }
    if let Some(m) = &wire.m {
        return decode_map(m).map(Value::Map);
    }
    if let Some(l) = &wire.l {
        return l.iter().map(decode).collect::<Result<Vec<_>>>().map(Value::List);
    }
    if wire.null.is_some() {
        return Ok(Value::Null);
    }

    Err(CodecError::MalformedAttribute(format!(
        "unsupported type tag: {}",
        tags[0]
    )))
}

/// Decode every entry of a wire map, preserving entry order.
pub fn decode_map(image: &Image) -> Result<AttributeMap> {
    image
        .iter()
        .map(|(key, wire)| {
            decode(wire)
                .map(|value| (key.clone(), value))
                .map_err(|e| match e {
                    CodecError::MalformedAttribute(msg) => {
                        CodecError::MalformedAttribute(format!("{key}: {msg}"))
                    }
                })
        })
        .collect()
}

/// Decode an optional record image.
///
/// An absent image decodes to an empty map, not an error.
pub fn decode_image(image: Option<&Image>) -> Result<AttributeMap> {
    match image {
        Some(image) => decode_map(image),
        None => Ok(AttributeMap::new()),
    }
}

/// Encode a value into its wire representation.
pub fn encode(value: &Value) -> WireValue {
    match value {
        Value::String(s) => WireValue::string(s.clone()),
        Value::Number(n) => WireValue::number(n),
        Value::Bool(b) => WireValue::boolean(*b),
        Value::Null => WireValue::null(),
        Value::Map(map) => WireValue::map(encode_map(map)),
        Value::List(items) => WireValue::list(items.iter().map(encode).collect()),
    }
}

/// Encode every entry of a decoded map, preserving entry order.
pub fn encode_map(map: &AttributeMap) -> Image {
    map.iter()
        .map(|(key, value)| (key.clone(), encode(value)))
        .collect()
}

/// Parse a wire number into an exact decimal.
pub fn parse_number(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| CodecError::MalformedAttribute(format!("invalid number {raw:?}: {e}")))
}
