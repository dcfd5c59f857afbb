//! Request model: the unit of work pulled from a source.

use std::fmt;

use serde_json::{Map, Value};

use super::errors::ValidationError;
use super::ids::{RequestId, WidgetId};
use super::validation::{self, ValidationMode};
use super::widget::{Widget, WidgetKey};

/// Wire field names.
pub mod fields {
    pub const TYPE: &str = "type";
    pub const REQUEST_ID: &str = "requestId";
    pub const WIDGET_ID: &str = "widgetId";
    pub const OWNER: &str = "owner";
    pub const LABEL: &str = "label";
    pub const DESCRIPTION: &str = "description";
    pub const OTHER_ATTRIBUTES: &str = "otherAttributes";
    /// Key field of the attribute-typed backend.
    pub const ID: &str = "id";
}

/// Recognized request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Create,
    Update,
    Delete,
}

impl RequestKind {
    /// Case-insensitive parse; surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request that passed validation.
///
/// The original body is kept intact until [`Request::into_widget`] normalizes it.
#[derive(Debug, Clone)]
pub struct Request {
    kind: String,
    request_id: Option<RequestId>,
    key: WidgetKey,
    body: Map<String, Value>,
}

impl Request {
    /// Decodes raw bytes and validates them.
    pub fn decode(raw: &[u8], mode: ValidationMode) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| ValidationError::Undecodable(e.to_string()))?;
        Self::from_value(value, mode)
    }

    pub fn from_value(value: Value, mode: ValidationMode) -> Result<Self, ValidationError> {
        validation::validate(&value, mode)?;
        let Value::Object(body) = value else {
            return Err(ValidationError::NotAnObject);
        };

        // validate() guarantees these are present strings
        let kind = string_field(&body, fields::TYPE)?.trim().to_ascii_lowercase();
        let widget_id = WidgetId::parse(string_field(&body, fields::WIDGET_ID)?)?;
        let owner = string_field(&body, fields::OWNER)?.to_string();
        let request_id = body
            .get(fields::REQUEST_ID)
            .and_then(Value::as_str)
            .and_then(|s| RequestId::parse(s).ok());

        Ok(Self {
            kind,
            request_id,
            key: WidgetKey::new(widget_id, owner),
            body,
        })
    }

    /// Lowercased kind exactly as received (may be unrecognized in minimal mode).
    pub fn raw_kind(&self) -> &str {
        &self.kind
    }

    pub fn kind(&self) -> Option<RequestKind> {
        RequestKind::parse(&self.kind)
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn key(&self) -> &WidgetKey {
        &self.key
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Drops `type`, flattens `otherAttributes` into top-level fields.
    pub fn into_widget(self) -> Widget {
        Widget::from_request_body(self.key, self.body)
    }
}

fn string_field<'a>(
    body: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    body.get(field)
        .ok_or(ValidationError::MissingField(field))?
        .as_str()
        .ok_or(ValidationError::NotAString(field))
}
