//! Value-type classification of an arbitrary inbound payload (spec §4.4),
//! in the exact precedence order the mutator relies on.

use chrono::{DateTime, Utc};
use serde_json::Value;
use url::Url;

/// Payloads larger than this are always classified as `Blob` without even
/// attempting a UTF-8 decode.
pub const BLOB_THRESHOLD_BYTES: usize = 65536;

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadClass {
    Blob(Vec<u8>),
    Int64(i64),
    Float(f64),
    Duration(String),
    DateTime(DateTime<Utc>),
    Uri(Url),
    JsonObject(serde_json::Map<String, Value>),
    JsonArray(Vec<Value>),
    Xml(String),
    Str(String),
}

pub fn classify(payload: &[u8]) -> PayloadClass {
    if payload.len() > BLOB_THRESHOLD_BYTES {
        return PayloadClass::Blob(payload.to_vec());
    }
    let Ok(text) = std::str::from_utf8(payload) else {
        return PayloadClass::Blob(payload.to_vec());
    };

    if let Ok(i) = text.parse::<i64>() {
        return PayloadClass::Int64(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        return PayloadClass::Float(f);
    }
    if is_iso8601_duration(text) {
        return PayloadClass::Duration(text.to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return PayloadClass::DateTime(dt.with_timezone(&Utc));
    }
    if let Ok(url) = Url::parse(text) {
        return PayloadClass::Uri(url);
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        return PayloadClass::JsonObject(map);
    }
    if let Ok(Value::Array(arr)) = serde_json::from_str::<Value>(text) {
        return PayloadClass::JsonArray(arr);
    }
    if looks_like_xml(text) {
        return PayloadClass::Xml(text.to_string());
    }
    PayloadClass::Str(text.to_string())
}

fn is_iso8601_duration(text: &str) -> bool {
    text.starts_with('P')
        && text.len() > 1
        && text[1..]
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, 'Y' | 'M' | 'W' | 'D' | 'T' | 'H' | 'S' | '.'))
}

fn looks_like_xml(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with('<') && trimmed.ends_with('>')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_in_documented_precedence_order() {
        assert!(matches!(classify(b"100"), PayloadClass::Int64(100)));
        assert!(matches!(classify(b"1.5"), PayloadClass::Float(_)));
        assert!(matches!(classify(b"PT1H30M"), PayloadClass::Duration(_)));
        assert!(matches!(
            classify(b"2024-01-01T00:00:00Z"),
            PayloadClass::DateTime(_)
        ));
        assert!(matches!(classify(b"https://example.com/x"), PayloadClass::Uri(_)));
        assert!(matches!(classify(b"{\"a\":1}"), PayloadClass::JsonObject(_)));
        assert!(matches!(classify(b"[1,2,3]"), PayloadClass::JsonArray(_)));
        assert!(matches!(classify(b"<a><b/></a>"), PayloadClass::Xml(_)));
        assert!(matches!(classify(b"Kilroy was here"), PayloadClass::Str(_)));
    }

    #[test]
    fn oversize_payload_is_blob_without_utf8_attempt() {
        let payload = vec![0xFFu8; BLOB_THRESHOLD_BYTES + 1];
        assert!(matches!(classify(&payload), PayloadClass::Blob(_)));
    }

    #[test]
    fn invalid_utf8_is_blob() {
        let payload = vec![0xFF, 0xFE, 0xFD];
        assert!(matches!(classify(&payload), PayloadClass::Blob(_)));
    }
}
