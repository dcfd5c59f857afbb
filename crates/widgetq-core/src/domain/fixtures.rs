//! Shared request bodies for unit tests.

use serde_json::{Value, json};

pub const WIDGET_ID: &str = "8123f304-f23f-440b-a6d3-80e979fa4cd6";

pub fn sample_request() -> Value {
    json!({
        "type": "create",
        "requestId": "e80fab52-71a5-4a76-8c4d-11b66b83ca2a",
        "widgetId": WIDGET_ID,
        "owner": "Mary Matthews",
        "label": "JWJYY",
        "description": "THBRNVNQPYAWNHGRGUKIOWCKXIVNDLWOIQTADHVEVMUAJWDONEPUEAXDITDSHJTDLCMHHSESFXSDZJCBLGIKKPUYAWKQAQI",
        "otherAttributes": [
            {"name": "width-unit", "value": "cm"},
            {"name": "length-unit", "value": "cm"},
            {"name": "rating", "value": "2.580677"},
            {"name": "note", "value": "FEGYXHIJCTYNUMNMGZBEIDLKXYFNHFLVDYZRNWUDQAKQSVFLPRJTTXARVEIFDOLTUSWZZWVERNWPPOEYSUF"}
        ]
    })
}

pub fn sample_bytes() -> Vec<u8> {
    serde_json::to_vec(&sample_request()).unwrap()
}

pub fn request_bytes(kind: &str) -> Vec<u8> {
    let mut raw = sample_request();
    raw["type"] = json!(kind);
    serde_json::to_vec(&raw).unwrap()
}
