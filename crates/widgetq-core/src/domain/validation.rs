//! Validator - request の受理判定（純粋関数）
//!
//! # 学習ポイント
//! - I/O も変更も行わない決定的な検査
//! - 最初に失敗した規則を型付きエラーで返す（ログに理由を残せる）
//!
//! # 規則（Strict）
//! 1. 必須フィールドがすべて存在する
//! 2. 文字列フィールドは trim 後に空でない
//! 3. `type` は create / update / delete（大文字小文字を区別しない）
//! 4. `requestId` と `widgetId` は正規形識別子
//! 5. `otherAttributes` は `{name, value}` の列で、どちらも trim 後に空でない

use serde_json::{Map, Value};

use super::errors::ValidationError;
use super::ids::is_canonical;
use super::request::{RequestKind, fields};

/// Every field the strict rule set requires.
pub const REQUIRED_FIELDS: [&str; 7] = [
    fields::TYPE,
    fields::REQUEST_ID,
    fields::WIDGET_ID,
    fields::OWNER,
    fields::LABEL,
    fields::DESCRIPTION,
    fields::OTHER_ATTRIBUTES,
];

const STRING_FIELDS: [&str; 6] = [
    fields::TYPE,
    fields::REQUEST_ID,
    fields::WIDGET_ID,
    fields::OWNER,
    fields::LABEL,
    fields::DESCRIPTION,
];

/// Which rule set to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// All five rules. Used by ingress and, by default, the router.
    #[default]
    Strict,
    /// Router's minimum gate: `type` and `owner` are non-empty strings and
    /// `widgetId` is canonical. `otherAttributes` is still checked when present.
    Minimal,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Minimal => "minimal",
        }
    }
}

/// Checks `raw` against the rule set selected by `mode`.
pub fn validate(raw: &Value, mode: ValidationMode) -> Result<(), ValidationError> {
    let map = raw.as_object().ok_or(ValidationError::NotAnObject)?;
    match mode {
        ValidationMode::Strict => validate_strict(map),
        ValidationMode::Minimal => validate_minimal(map),
    }
}

/// Boolean form of [`validate`].
pub fn is_valid(raw: &Value, mode: ValidationMode) -> bool {
    validate(raw, mode).is_ok()
}

fn validate_strict(map: &Map<String, Value>) -> Result<(), ValidationError> {
    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !map.contains_key(**f)) {
        return Err(ValidationError::MissingField(*missing));
    }
    for field in STRING_FIELDS {
        non_empty_str(map, field)?;
    }
    check_kind(map)?;
    check_identifier(map, fields::REQUEST_ID)?;
    check_identifier(map, fields::WIDGET_ID)?;
    check_attributes(&map[fields::OTHER_ATTRIBUTES])
}

fn validate_minimal(map: &Map<String, Value>) -> Result<(), ValidationError> {
    non_empty_str(map, fields::TYPE)?;
    check_identifier(map, fields::WIDGET_ID)?;
    non_empty_str(map, fields::OWNER)?;
    match map.get(fields::OTHER_ATTRIBUTES) {
        Some(attributes) => check_attributes(attributes),
        None => Ok(()),
    }
}

fn non_empty_str<'a>(
    map: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    let value = map.get(field).ok_or(ValidationError::MissingField(field))?;
    let s = value.as_str().ok_or(ValidationError::NotAString(field))?;
    if s.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(s)
}

fn check_kind(map: &Map<String, Value>) -> Result<(), ValidationError> {
    let kind = non_empty_str(map, fields::TYPE)?;
    RequestKind::parse(kind)
        .map(|_| ())
        .ok_or_else(|| ValidationError::UnknownKind(kind.to_string()))
}

fn check_identifier(map: &Map<String, Value>, field: &'static str) -> Result<(), ValidationError> {
    let value = non_empty_str(map, field)?;
    if !is_canonical(value) {
        return Err(ValidationError::InvalidIdentifier {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn check_attributes(attributes: &Value) -> Result<(), ValidationError> {
    let items = attributes
        .as_array()
        .ok_or(ValidationError::AttributesNotASequence)?;
    for (index, item) in items.iter().enumerate() {
        let pair = item.as_object().ok_or(ValidationError::MalformedAttribute {
            index,
            part: "entry",
            problem: "is not an object",
        })?;
        check_attribute_part(pair, index, "name")?;
        check_attribute_part(pair, index, "value")?;
    }
    Ok(())
}

fn check_attribute_part(
    pair: &Map<String, Value>,
    index: usize,
    part: &'static str,
) -> Result<(), ValidationError> {
    let problem = match pair.get(part) {
        None => "is missing",
        Some(Value::String(s)) if s.trim().is_empty() => "is empty",
        Some(Value::String(_)) => return Ok(()),
        Some(_) => "is not a string",
    };
    Err(ValidationError::MalformedAttribute {
        index,
        part,
        problem,
    })
}
