//! Domain identifiers (strongly-typed IDs).
//!
//! `requestId` と `widgetId` はどちらも 36 文字の正規形識別子です。
//! 検査は構造のみ（ハイフン位置 + 16 進数）で、UUID の version/variant
//! ニブルは見ません。ingress と router で同じ規則を使います。
//!
//! ## Phantom Type パターン
//! `Identifier<T>` で検査ロジックを共有しつつ、`T` をマーカー型にして
//! `RequestId` と `WidgetId` を混同できないようにしています。

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::domain::errors::ValidationError;

/// Total length of a canonical identifier.
pub const IDENTIFIER_LEN: usize = 36;

/// Byte offsets that must hold `-`.
pub const HYPHEN_OFFSETS: [usize; 4] = [8, 13, 18, 23];

/// Returns `true` when `candidate` is a canonical 36-character identifier.
///
/// Hex digits may be upper or lower case.
pub fn is_canonical(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    if bytes.len() != IDENTIFIER_LEN {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| {
        if HYPHEN_OFFSETS.contains(&i) {
            *b == b'-'
        } else {
            b.is_ascii_hexdigit()
        }
    })
}

/// IdMarker は各 ID 型のマーカー trait
///
/// エラーメッセージで使うフィールド名（"requestId", "widgetId"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn field() -> &'static str;
}

/// ジェネリック ID 型（検査済みの文字列を保持）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier<T: IdMarker> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Identifier<T> {
    /// Parses `value`, keeping the caller's casing.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if !is_canonical(&value) {
            return Err(ValidationError::InvalidIdentifier {
                field: T::field(),
                value,
            });
        }
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> FromStr for Identifier<T> {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<T: IdMarker> AsRef<str> for Identifier<T> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl<T: IdMarker> fmt::Display for Identifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Request {}

impl IdMarker for Request {
    fn field() -> &'static str {
        "requestId"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Widget {}

impl IdMarker for Widget {
    fn field() -> &'static str {
        "widgetId"
    }
}

/// Identifier of a Request (traceability only, never an idempotency key).
pub type RequestId = Identifier<Request>;

/// Identifier of a Widget (the entity key for every storage operation).
pub type WidgetId = Identifier<Widget>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SAMPLE: &str = "8123f304-f23f-440b-a6d3-80e979fa4cd6";

    #[test]
    fn sample_identifier_is_canonical() {
        assert!(is_canonical(SAMPLE));
        assert!(is_canonical(&SAMPLE.to_uppercase()));
    }

    #[rstest]
    #[case("")]
    #[case("8123f304")]
    #[case("8123f304-f23f-440b-a6d3-80e979fa4cd")]
    #[case("8123f304-f23f-440b-a6d3-80e979fa4cd66")]
    #[case("8123f304f23f440ba6d380e979fa4cd6")]
    #[case("{8123f304-f23f-440b-a6d3-80e979fa4cd6}")]
    fn wrong_length_is_rejected(#[case] candidate: &str) {
        assert_ne!(candidate.len(), IDENTIFIER_LEN);
        assert!(!is_canonical(candidate));
    }

    #[rstest]
    #[case(8)]
    #[case(13)]
    #[case(18)]
    #[case(23)]
    fn hyphen_positions_are_fixed(#[case] offset: usize) {
        let mut bytes = SAMPLE.as_bytes().to_vec();
        bytes[offset] = b'a';
        let mutated = String::from_utf8(bytes).unwrap();
        assert!(!is_canonical(&mutated));
    }

    #[test]
    fn every_hex_position_rejects_g() {
        for offset in (0..IDENTIFIER_LEN).filter(|i| !HYPHEN_OFFSETS.contains(i)) {
            let mut bytes = SAMPLE.as_bytes().to_vec();
            bytes[offset] = b'g';
            let mutated = String::from_utf8(bytes).unwrap();
            assert!(!is_canonical(&mutated), "offset {offset} accepted 'g'");
        }
    }

    #[test]
    fn version_nibble_is_not_enforced() {
        // version 0 / variant 0 is structurally fine
        assert!(is_canonical("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn multibyte_input_of_36_chars_is_rejected() {
        let candidate = "é".repeat(36);
        assert!(!is_canonical(&candidate));
    }

    #[test]
    fn parse_reports_the_field_name() {
        let err = WidgetId::parse("nope").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidIdentifier { field: "widgetId", .. }
        ));
        let err = "nope".parse::<RequestId>().unwrap_err();
        assert!(err.to_string().contains("requestId"));
    }

    #[test]
    fn parse_keeps_casing() {
        let upper = SAMPLE.to_uppercase();
        let id = WidgetId::parse(upper.clone()).unwrap();
        assert_eq!(id.as_str(), upper);
        assert_eq!(id.to_string(), upper);
    }
}
