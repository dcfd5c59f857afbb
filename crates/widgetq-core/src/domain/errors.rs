//! Errors - ドメインエラー
//!
//! I/O を伴わないエラーだけをここに置きます。
//! ポート固有のエラー（ObjectStoreError, QueueError など）は各 port に定義します。

/// ValidationError は request が受理できない理由（最初に失敗した規則）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("body is not valid JSON: {0}")]
    Undecodable(String),

    #[error("request is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{0}` must be a string")]
    NotAString(&'static str),

    #[error("field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("unknown request type `{0}`")]
    UnknownKind(String),

    #[error("field `{field}` is not a canonical identifier: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("`otherAttributes` must be a sequence")]
    AttributesNotASequence,

    #[error("`otherAttributes[{index}]` {part} {problem}")]
    MalformedAttribute {
        index: usize,
        part: &'static str,
        problem: &'static str,
    },
}

/// AttributeError は tagged attribute に変換できない値
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error("{kind} values cannot be stored as attributes")]
    Unsupported { kind: &'static str },
}
