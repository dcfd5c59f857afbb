//! Widget - 永続化されるエンティティ
//!
//! Request から `type` を取り除き、`otherAttributes` をトップレベルに
//! 展開したものが Widget になります。create と update はどちらも全置換です。

use serde_json::{Map, Value};

use super::ids::WidgetId;
use super::request::fields;

/// Fields an attribute pair may never overwrite.
pub const RESERVED_FIELDS: [&str; 8] = [
    fields::TYPE,
    fields::REQUEST_ID,
    fields::WIDGET_ID,
    fields::OWNER,
    fields::LABEL,
    fields::DESCRIPTION,
    fields::OTHER_ATTRIBUTES,
    fields::ID,
];

/// Storage path segment for an owner: trimmed, spaces to hyphens, lowercased.
pub fn normalize_owner(owner: &str) -> String {
    owner.trim().replace(' ', "-").to_lowercase()
}

/// Everything a backend needs to locate a widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WidgetKey {
    id: WidgetId,
    owner: String,
}

impl WidgetKey {
    pub fn new(id: WidgetId, owner: impl Into<String>) -> Self {
        Self {
            id,
            owner: owner.into(),
        }
    }

    pub fn id(&self) -> &WidgetId {
        &self.id
    }

    /// Owner as received.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn owner_segment(&self) -> String {
        normalize_owner(&self.owner)
    }
}

/// A normalized widget record, ready for a storage backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    key: WidgetKey,
    fields: Map<String, Value>,
}

impl Widget {
    pub(crate) fn from_request_body(key: WidgetKey, mut body: Map<String, Value>) -> Self {
        body.remove(fields::TYPE);
        let attributes = body.remove(fields::OTHER_ATTRIBUTES);

        if let Some(Value::Array(pairs)) = attributes {
            for pair in pairs {
                let (Some(name), Some(value)) = (
                    pair.get("name").and_then(Value::as_str),
                    pair.get("value").and_then(Value::as_str),
                ) else {
                    continue;
                };
                if RESERVED_FIELDS.contains(&name) {
                    tracing::warn!(
                        widget_id = %key.id(),
                        attribute = name,
                        "attribute shadows a reserved field; dropped"
                    );
                    continue;
                }
                // later pairs win
                body.insert(name.to_string(), Value::String(value.to_string()));
            }
        }

        Self { key, fields: body }
    }

    pub fn key(&self) -> &WidgetKey {
        &self.key
    }

    pub fn id(&self) -> &WidgetId {
        self.key.id()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// JSON document body as written by the document backend.
    pub fn to_document(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::sample_request;
    use crate::domain::{Request, ValidationMode};
    use serde_json::json;

    fn widget_from(raw: Value) -> Widget {
        Request::from_value(raw, ValidationMode::Strict)
            .unwrap()
            .into_widget()
    }

    #[test]
    fn owner_is_normalized_for_paths() {
        assert_eq!(normalize_owner("Mary Matthews"), "mary-matthews");
        assert_eq!(normalize_owner("  Sue  Ellen "), "sue--ellen");
        assert_eq!(normalize_owner("ACME"), "acme");
    }

    #[test]
    fn attributes_are_flattened() {
        let mut raw = sample_request();
        raw["otherAttributes"] = json!([{"name": "width-unit", "value": "cm"}]);
        let widget = widget_from(raw);

        assert_eq!(widget.get("width-unit"), Some(&json!("cm")));
        assert!(widget.get("otherAttributes").is_none());
        assert!(widget.get("type").is_none());
        assert_eq!(widget.get("owner"), Some(&json!("Mary Matthews")));
        assert_eq!(widget.get("label"), Some(&json!("JWJYY")));
    }

    #[test]
    fn later_attribute_wins() {
        let mut raw = sample_request();
        raw["otherAttributes"] = json!([
            {"name": "color", "value": "red"},
            {"name": "color", "value": "blue"},
        ]);
        assert_eq!(widget_from(raw).get("color"), Some(&json!("blue")));
    }

    #[test]
    fn reserved_fields_are_not_overwritten() {
        let mut raw = sample_request();
        raw["otherAttributes"] = json!([
            {"name": "owner", "value": "Mallory"},
            {"name": "id", "value": "spoofed"},
        ]);
        let widget = widget_from(raw);
        assert_eq!(widget.get("owner"), Some(&json!("Mary Matthews")));
        assert!(widget.get("id").is_none());
    }

    #[test]
    fn extra_top_level_fields_are_kept() {
        let mut raw = sample_request();
        raw["rating"] = json!(2.580677);
        let widget = widget_from(raw);
        assert_eq!(widget.get("rating"), Some(&json!(2.580677)));
    }

    #[test]
    fn document_has_no_request_kind() {
        let widget = widget_from(sample_request());
        let document = widget.to_document();
        assert!(document.get("type").is_none());
        assert_eq!(document["widgetId"], json!(widget.id().as_str()));
    }
}
