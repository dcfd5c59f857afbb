//! Tagged attribute values for the key-value backend.
//!
//! The closed set {S, N, L, M} serializes in the same externally tagged
//! shape the key-value store uses on the wire: `{"S": "..."}`, `{"N": "2.5"}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::AttributeError;
use super::request::fields;
use super::widget::Widget;

/// One tagged value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String.
    S(String),
    /// Number, kept in its decimal string form.
    N(String),
    /// List.
    L(Vec<AttributeValue>),
    /// Map, keys preserved.
    M(BTreeMap<String, AttributeValue>),
}

/// A full record: field name to tagged value.
pub type Item = BTreeMap<String, AttributeValue>;

impl AttributeValue {
    /// Recursively tags a JSON value. Booleans and null fail fast.
    pub fn from_json(value: &Value) -> Result<Self, AttributeError> {
        match value {
            Value::String(s) => Ok(Self::S(s.clone())),
            Value::Number(n) => Ok(Self::N(n.to_string())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::L),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), Self::from_json(v)?)))
                .collect::<Result<BTreeMap<_, _>, AttributeError>>()
                .map(Self::M),
            Value::Bool(_) => Err(AttributeError::Unsupported { kind: "boolean" }),
            Value::Null => Err(AttributeError::Unsupported { kind: "null" }),
        }
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }
}

/// Builds the stored item for a widget: `id = S(widgetId)` plus every field tagged.
///
/// On failure returns the offending top-level field name with the error.
pub fn widget_item(widget: &Widget) -> Result<Item, (String, AttributeError)> {
    let mut item = Item::new();
    item.insert(
        fields::ID.to_string(),
        AttributeValue::S(widget.id().as_str().to_string()),
    );
    for (name, value) in widget.fields() {
        let tagged = AttributeValue::from_json(value).map_err(|e| (name.clone(), e))?;
        item.insert(name.clone(), tagged);
    }
    Ok(item)
}
