//! Conversion between SDK attribute values and decoded values.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;

use crate::codec::{parse_number, AttributeMap, CodecError, Value};

pub fn to_attribute_value(value: &Value) -> AttributeValue {
    match value {
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Null => AttributeValue::Null(true),
        Value::Map(m) => AttributeValue::M(to_item(m)),
        Value::List(l) => AttributeValue::L(l.iter().map(to_attribute_value).collect()),
    }
}

pub fn to_item(map: &AttributeMap) -> HashMap<String, AttributeValue> {
    map.iter()
        .map(|(k, v)| (k.clone(), to_attribute_value(v)))
        .collect()
}

pub fn from_attribute_value(value: &AttributeValue) -> Result<Value, CodecError> {
    match value {
        AttributeValue::S(s) => Ok(Value::String(s.clone())),
        AttributeValue::N(n) => parse_number(n).map(Value::Number),
        AttributeValue::Bool(b) => Ok(Value::Bool(*b)),
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::M(m) => from_item(m).map(Value::Map),
        AttributeValue::L(l) => l
            .iter()
            .map(from_attribute_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        other => Err(CodecError::MalformedAttribute(format!(
            "unsupported attribute type: {other:?}"
        ))),
    }
}

/// Decode an SDK item. Keys are sorted, since the SDK map carries no order.
pub fn from_item(item: &HashMap<String, AttributeValue>) -> Result<AttributeMap, CodecError> {
    let mut keys: Vec<&String> = item.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|k| {
            from_attribute_value(&item[k])
                .map(|v| (k.clone(), v))
                .map_err(|e| match e {
                    CodecError::MalformedAttribute(msg) => {
                        CodecError::MalformedAttribute(format!("{k}: {msg}"))
                    }
                })
        })
        .collect()
}
