//! Interoperable canonicalization (spec §4.1): a deterministic, order
//! preserving rendering of `InteroperableField`s into the XMPP-style
//! sensor-data XML payload form, and the corresponding parser used on the
//! receive path.
//!
//! Each field becomes one self-closing element, named after its value type,
//! carrying its thing reference and timestamp as attributes. Fields are
//! never reordered or grouped: round-tripping a payload yields back fields
//! in exactly the order they were given.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::TelemetryError;
use crate::interoperable::{FieldType, FieldValue, InteroperableField, SIGNATURE_FIELD_NAME};

/// Renders the given fields. Rejects input that already contains a field
/// named `Signature` — callers must append that via [`build_signed_xml`].
pub fn build_xml(fields: &[InteroperableField]) -> Result<Vec<u8>, TelemetryError> {
    if fields.iter().any(|f| f.name == SIGNATURE_FIELD_NAME) {
        return Err(TelemetryError::Xml(format!(
            "field name {SIGNATURE_FIELD_NAME} is reserved"
        )));
    }
    Ok(render(fields, None))
}

/// Renders the given fields plus a trailing `Signature` field carrying the
/// base64url-encoded signature over [`build_xml`]'s output.
pub fn build_signed_xml(fields: &[InteroperableField], signature_b64url: &str) -> Vec<u8> {
    render(fields, Some(signature_b64url))
}

/// Renders fields with no reserved-name check, for callers (the troll
/// mutator) that need to re-emit an XML document verbatim regardless of
/// whether it already carries a `Signature` field.
pub(crate) fn render(fields: &[InteroperableField], signature: Option<&str>) -> Vec<u8> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Start(BytesStart::new("fields")))
        .expect("writing to an in-memory buffer cannot fail");

    for field in fields {
        write_field(&mut writer, field);
    }

    if let Some(sig) = signature {
        let signature_field = InteroperableField::new(
            fields
                .last()
                .map(|f| f.node_id.clone())
                .unwrap_or_default(),
            fields.last().map(|f| f.timestamp).unwrap_or_else(Utc::now),
            SIGNATURE_FIELD_NAME,
            FieldValue::Str(sig.to_string()),
            FieldType::Computed,
        );
        write_field(&mut writer, &signature_field);
    }

    writer
        .write_event(Event::End(quick_xml::events::BytesEnd::new("fields")))
        .expect("writing to an in-memory buffer cannot fail");
    writer.into_inner()
}

fn write_field(writer: &mut Writer<Vec<u8>>, field: &InteroperableField) {
    let mut start = BytesStart::new(field.value.element_name());
    start.push_attribute(("nodeId", field.node_id.as_str()));
    let timestamp = field.timestamp.to_rfc3339();
    start.push_attribute(("timestamp", timestamp.as_str()));
    start.push_attribute(("name", field.name.as_str()));
    let value_str = format_value(&field.value);
    start.push_attribute(("value", value_str.as_str()));

    let decimals_str;
    if let FieldValue::Quantity { decimals, unit, .. } = &field.value {
        start.push_attribute(("unit", unit.as_str()));
        decimals_str = decimals.to_string();
        start.push_attribute(("decimals", decimals_str.as_str()));
    }
    if let FieldValue::Enum { data_type, .. } = &field.value {
        start.push_attribute(("dataType", data_type.as_str()));
    }
    start.push_attribute(("type", field.field_type.as_str()));
    start.push_attribute(("automaticReadout", "true"));

    writer
        .write_event(Event::Empty(start))
        .expect("writing to an in-memory buffer cannot fail");
}

fn format_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::Int32(i) => i.to_string(),
        FieldValue::Int64(i) => i.to_string(),
        FieldValue::Str(s) => s.clone(),
        FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        FieldValue::DateTime(dt) => dt.to_rfc3339(),
        FieldValue::Duration(s) => s.clone(),
        FieldValue::Time(t) => t.format("%H:%M:%S").to_string(),
        FieldValue::Quantity {
            magnitude,
            decimals,
            ..
        } => format!("{:.*}", *decimals as usize, magnitude),
        FieldValue::Enum { value, .. } => value.clone(),
    }
}

/// Parses a rendered payload back into its field list, in document order.
pub fn parse_xml(bytes: &[u8]) -> Result<Vec<InteroperableField>, TelemetryError> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut fields = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Empty(e)) => {
                fields.push(parse_field_element(&e)?);
            }
            Ok(Event::Start(e)) if e.name().as_ref() == b"fields" => {}
            Ok(Event::End(_)) | Ok(Event::Text(_)) | Ok(Event::Decl(_)) => {}
            Ok(other) => {
                return Err(TelemetryError::Xml(format!(
                    "unexpected xml event: {other:?}"
                )))
            }
            Err(err) => return Err(TelemetryError::Xml(err.to_string())),
        }
        buf.clear();
    }
    Ok(fields)
}

/// Splits a parsed field list into the signed payload fields and the single
/// signature value. Fails unless exactly one `Signature` field is present.
pub fn split_signature(
    fields: Vec<InteroperableField>,
) -> Result<(Vec<InteroperableField>, String), TelemetryError> {
    let count = fields
        .iter()
        .filter(|f| f.name == SIGNATURE_FIELD_NAME)
        .count();
    if count != 1 {
        return Err(TelemetryError::SignatureCount(count));
    }
    let mut payload = Vec::with_capacity(fields.len() - 1);
    let mut signature = None;
    for field in fields {
        if field.name == SIGNATURE_FIELD_NAME {
            match field.value {
                FieldValue::Str(s) => signature = Some(s),
                _ => return Err(TelemetryError::Xml("Signature field must be a string".into())),
            }
        } else {
            payload.push(field);
        }
    }
    Ok((payload, signature.expect("count == 1 guarantees presence")))
}

fn parse_field_element(e: &BytesStart) -> Result<InteroperableField, TelemetryError> {
    let element_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();

    let mut node_id = None;
    let mut timestamp_raw = None;
    let mut name = None;
    let mut value_raw = None;
    let mut unit = None;
    let mut decimals = None;
    let mut data_type = None;
    let mut field_type_raw = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|err| TelemetryError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let val = attr
            .unescape_value()
            .map_err(|err| TelemetryError::Xml(err.to_string()))?
            .into_owned();
        match key.as_str() {
            "nodeId" => node_id = Some(val),
            "timestamp" => timestamp_raw = Some(val),
            "name" => name = Some(val),
            "value" => value_raw = Some(val),
            "unit" => unit = Some(val),
            "decimals" => decimals = Some(val),
            "dataType" => data_type = Some(val),
            "type" => field_type_raw = Some(val),
            "automaticReadout" => {}
            other => return Err(TelemetryError::Xml(format!("unknown attribute {other}"))),
        }
    }

    let node_id = node_id.ok_or_else(|| TelemetryError::Xml("missing nodeId".into()))?;
    let timestamp_raw =
        timestamp_raw.ok_or_else(|| TelemetryError::Xml("missing timestamp".into()))?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_raw)
        .map_err(|e| TelemetryError::Xml(e.to_string()))?
        .with_timezone(&Utc);
    let name = name.ok_or_else(|| TelemetryError::Xml("missing name".into()))?;
    let value_raw = value_raw.ok_or_else(|| TelemetryError::Xml("missing value".into()))?;
    let field_type = field_type_raw
        .as_deref()
        .and_then(FieldType::from_str)
        .ok_or_else(|| TelemetryError::Xml("missing or invalid type attribute".into()))?;

    let value = parse_value(&element_name, &value_raw, unit, decimals, data_type)?;

    Ok(InteroperableField {
        node_id,
        timestamp,
        name,
        value,
        field_type,
    })
}

fn parse_value(
    element_name: &str,
    raw: &str,
    unit: Option<String>,
    decimals: Option<String>,
    data_type: Option<String>,
) -> Result<FieldValue, TelemetryError> {
    match element_name {
        "boolean" => raw
            .parse()
            .map(FieldValue::Boolean)
            .map_err(|_| TelemetryError::Xml("invalid boolean value".into())),
        "int" => raw
            .parse()
            .map(FieldValue::Int32)
            .map_err(|_| TelemetryError::Xml("invalid int value".into())),
        "long" => raw
            .parse()
            .map(FieldValue::Int64)
            .map_err(|_| TelemetryError::Xml("invalid long value".into())),
        "string" => Ok(FieldValue::Str(raw.to_string())),
        "date" => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(FieldValue::Date)
            .map_err(|e| TelemetryError::Xml(e.to_string())),
        "dateTime" => DateTime::parse_from_rfc3339(raw)
            .map(|dt| FieldValue::DateTime(dt.with_timezone(&Utc)))
            .map_err(|e| TelemetryError::Xml(e.to_string())),
        "duration" => Ok(FieldValue::Duration(raw.to_string())),
        "time" => NaiveTime::parse_from_str(raw, "%H:%M:%S")
            .map(FieldValue::Time)
            .map_err(|e| TelemetryError::Xml(e.to_string())),
        "numeric" => {
            let magnitude: f64 = raw
                .parse()
                .map_err(|_| TelemetryError::Xml("invalid numeric value".into()))?;
            let decimals: u8 = decimals
                .ok_or_else(|| TelemetryError::Xml("numeric field missing decimals".into()))?
                .parse()
                .map_err(|_| TelemetryError::Xml("invalid decimals attribute".into()))?;
            Ok(FieldValue::Quantity {
                magnitude,
                decimals,
                unit: unit.unwrap_or_default(),
            })
        }
        "enum" => Ok(FieldValue::Enum {
            value: raw.to_string(),
            data_type: data_type.unwrap_or_default(),
        }),
        other => Err(TelemetryError::Xml(format!(
            "unknown field element <{other}>"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_fields() -> Vec<InteroperableField> {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        vec![
            InteroperableField::new(
                "sensor-1",
                ts,
                "Temperature",
                FieldValue::Quantity {
                    magnitude: 21.5,
                    decimals: 1,
                    unit: "C".into(),
                },
                FieldType::Momentary,
            ),
            InteroperableField::new(
                "sensor-1",
                ts,
                "Online",
                FieldValue::Boolean(true),
                FieldType::Status,
            ),
        ]
    }

    #[test]
    fn build_then_parse_round_trips_in_order() {
        let fields = sample_fields();
        let xml = build_xml(&fields).unwrap();
        let parsed = parse_xml(&xml).unwrap();
        assert_eq!(parsed, fields);
    }

    #[test]
    fn build_xml_rejects_reserved_signature_name() {
        let ts = Utc::now();
        let fields = vec![InteroperableField::new(
            "n",
            ts,
            SIGNATURE_FIELD_NAME,
            FieldValue::Str("x".into()),
            FieldType::Computed,
        )];
        assert!(build_xml(&fields).is_err());
    }

    #[test]
    fn split_signature_recovers_payload_and_value() {
        let fields = sample_fields();
        let signed = build_signed_xml(&fields, "c2lnbmF0dXJl");
        let parsed = parse_xml(&signed).unwrap();
        let (payload, sig) = split_signature(parsed).unwrap();
        assert_eq!(payload, fields);
        assert_eq!(sig, "c2lnbmF0dXJl");
    }

    #[test]
    fn split_signature_rejects_missing_or_duplicate_signature() {
        let fields = sample_fields();
        assert!(matches!(
            split_signature(fields.clone()),
            Err(TelemetryError::SignatureCount(0))
        ));

        let mut doubled = fields;
        doubled.push(InteroperableField::new(
            "n",
            Utc::now(),
            SIGNATURE_FIELD_NAME,
            FieldValue::Str("a".into()),
            FieldType::Computed,
        ));
        doubled.push(InteroperableField::new(
            "n",
            Utc::now(),
            SIGNATURE_FIELD_NAME,
            FieldValue::Str("b".into()),
            FieldType::Computed,
        ));
        assert!(matches!(
            split_signature(doubled),
            Err(TelemetryError::SignatureCount(2))
        ));
    }
}
