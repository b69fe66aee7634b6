//! Type-aware perturbation menu (spec §4.4). Each `mutate_*` function
//! performs exactly one operation, chosen uniformly at random from that
//! type's menu; the caller (`troll::engine`) decides, via Trolliness,
//! whether to invoke one at all for a given message.

use chrono::{DateTime, Datelike, Timelike, Utc};
use rand::Rng;
use serde_json::Value;
use url::Url;

use crate::canonical::interoperable;
use crate::interoperable::{FieldType, FieldValue, InteroperableField};
use crate::troll::classify::PayloadClass;

const REPLACEMENT_STRING: &str = "Kilroy was here";

/// Largest byte index `<= idx` that lands on a UTF-8 char boundary of `s`.
/// Used before byte-slicing at an arbitrary midpoint so a multi-byte
/// character never gets split.
fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Result of one perturbation: the new payload bytes, and whether the
/// publish that carries it should be retained.
pub struct Mutation {
    pub payload: Vec<u8>,
    pub retain: bool,
}

impl Mutation {
    fn text(s: impl Into<String>, retain: bool) -> Self {
        Self {
            payload: s.into().into_bytes(),
            retain,
        }
    }
}

/// Splits 90/10 between the "small" (1 KiB, retained) and "large" (spec's
/// 99.0/0.9/0.1 split over 1 MiB/16 MiB/192 MiB, never retained) tiers. The
/// top-level split is this implementation's choice; the documented
/// percentages within "large" are exact (see DESIGN.md).
fn random_blob(rng: &mut impl Rng) -> Mutation {
    if rng.random_range(0..10) != 0 {
        let mut bytes = vec![0u8; 1024];
        rng.fill(&mut bytes[..]);
        return Mutation {
            payload: bytes,
            retain: true,
        };
    }
    let roll: f64 = rng.random::<f64>() * 100.0;
    let size = if roll < 99.0 {
        1024 * 1024
    } else if roll < 99.9 {
        16 * 1024 * 1024
    } else {
        192 * 1024 * 1024
    };
    let mut bytes = vec![0u8; size];
    rng.fill(&mut bytes[..]);
    Mutation {
        payload: bytes,
        retain: false,
    }
}

pub fn mutate(class: &PayloadClass, rng: &mut impl Rng) -> Mutation {
    match class {
        PayloadClass::Int64(i) => mutate_int64(*i, rng),
        PayloadClass::Float(f) => mutate_float(*f, rng),
        PayloadClass::Duration(s) => mutate_duration(s, rng),
        PayloadClass::DateTime(dt) => mutate_datetime(*dt, rng),
        PayloadClass::Uri(url) => mutate_uri(url, rng),
        PayloadClass::JsonObject(map) => mutate_json_object(map, rng),
        PayloadClass::JsonArray(items) => mutate_json_array(items, rng),
        PayloadClass::Xml(xml) => mutate_xml(xml, rng),
        PayloadClass::Str(s) => mutate_string(s, rng),
        PayloadClass::Blob(bytes) => mutate_blob(bytes, rng),
    }
}

fn mutate_int64(value: i64, rng: &mut impl Rng) -> Mutation {
    match rng.random_range(0..6) {
        0 => Mutation::text((value / 2).to_string(), true),
        1 => Mutation::text(value.wrapping_mul(2).to_string(), true),
        2 => Mutation::text(value.wrapping_neg().to_string(), true),
        3 => Mutation::text(rng.random::<i64>().to_string(), true),
        4 => Mutation::text(REPLACEMENT_STRING, true),
        _ => random_blob(rng),
    }
}

fn mutate_float(value: f64, rng: &mut impl Rng) -> Mutation {
    match rng.random_range(0..7) {
        0 => Mutation::text((value / 2.0).to_string(), true),
        1 => Mutation::text((value * 2.0).to_string(), true),
        2 => Mutation::text((-value).to_string(), true),
        3 => Mutation::text(rng.random::<f64>().to_string(), true),
        4 => Mutation::text(format!("{value:e}"), true),
        5 => Mutation::text(REPLACEMENT_STRING, true),
        _ => random_blob(rng),
    }
}

/// Scales the first run of ASCII digits found in an ISO-8601 duration
/// string; a crude but adequate stand-in for "halve/double/negate ticks".
fn scale_first_number(text: &str, factor: f64) -> String {
    let Some(start) = text.find(|c: char| c.is_ascii_digit()) else {
        return text.to_string();
    };
    let end = start
        + text[start..]
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len() - start);
    let Ok(n) = text[start..end].parse::<i64>() else {
        return text.to_string();
    };
    let scaled = ((n as f64) * factor).round() as i64;
    format!("{}{}{}", &text[..start], scaled, &text[end..])
}

fn mutate_duration(text: &str, rng: &mut impl Rng) -> Mutation {
    match rng.random_range(0..6) {
        0 => Mutation::text(scale_first_number(text, 0.5), true),
        1 => Mutation::text(scale_first_number(text, 2.0), true),
        2 => Mutation::text(scale_first_number(text, -1.0), true),
        3 => Mutation::text(format!("PT{}S", rng.random_range(0..100_000)), true),
        4 => Mutation::text(REPLACEMENT_STRING, true),
        _ => random_blob(rng),
    }
}

fn mutate_datetime(dt: DateTime<Utc>, rng: &mut impl Rng) -> Mutation {
    match rng.random_range(0..8) {
        0 => {
            let ticks = dt.timestamp() / 2;
            Mutation::text(
                DateTime::from_timestamp(ticks, 0)
                    .unwrap_or(dt)
                    .to_rfc3339(),
                true,
            )
        }
        1 => {
            let ticks = dt.timestamp().saturating_mul(2);
            Mutation::text(
                DateTime::from_timestamp(ticks, 0)
                    .unwrap_or(dt)
                    .to_rfc3339(),
                true,
            )
        }
        2..=6 => Mutation::text(invalidate_one_field(dt, rng.random_range(0..6)), true),
        7 => Mutation::text(REPLACEMENT_STRING, true),
        _ => random_blob(rng),
    }
}

/// Bumps one calendar field by +10 directly in the rendered string, on
/// purpose bypassing `chrono`'s validation so the result is structurally
/// well-formed but semantically invalid (spec §4.4).
fn invalidate_one_field(dt: DateTime<Utc>, field: u32) -> String {
    let (year, month, day, hour, minute, second) = (
        dt.year(),
        dt.month() as i64,
        dt.day() as i64,
        dt.hour() as i64,
        dt.minute() as i64,
        dt.second() as i64,
    );
    let (year, month, day, hour, minute, second) = match field {
        0 => (year as i64 + 10, month, day, hour, minute, second),
        1 => (year as i64, month + 10, day, hour, minute, second),
        2 => (year as i64, month, day + 10, hour, minute, second),
        3 => (year as i64, month, day, hour + 10, minute, second),
        4 => (year as i64, month, day, hour, minute + 10, second),
        _ => (year as i64, month, day, hour, minute, second + 10),
    };
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

fn mutate_uri(url: &Url, rng: &mut impl Rng) -> Mutation {
    let s = url.as_str();
    match rng.random_range(0..6) {
        0 => Mutation::text(s[..floor_char_boundary(s, s.len() / 2)].to_string(), true),
        1 => Mutation::text(s.replacen(url.scheme(), "ftp", 1), true),
        2 => {
            let mangled = s.replacen(url.host_str().unwrap_or(""), "evil.example", 1);
            Mutation::text(mangled, true)
        }
        3 => Mutation::text(format!("{s}/../../etc/passwd"), true),
        4 => Mutation::text(REPLACEMENT_STRING, true),
        _ => random_blob(rng),
    }
}

fn mutate_string(text: &str, rng: &mut impl Rng) -> Mutation {
    match rng.random_range(0..4) {
        0 => Mutation::text(text[..floor_char_boundary(text, text.len() / 2)].to_string(), true),
        1 => Mutation::text(text.repeat(2), true),
        2 => Mutation::text(REPLACEMENT_STRING, true),
        _ => random_blob(rng),
    }
}

fn mutate_blob(bytes: &[u8], rng: &mut impl Rng) -> Mutation {
    match rng.random_range(0..4) {
        0 => Mutation {
            payload: bytes[..bytes.len() / 2].to_vec(),
            retain: false,
        },
        1 => {
            let mut doubled = bytes.to_vec();
            doubled.extend_from_slice(bytes);
            Mutation {
                payload: doubled,
                retain: false,
            }
        }
        2 => {
            let mut copy = bytes.to_vec();
            rng.fill(&mut copy[..]);
            Mutation {
                payload: copy,
                retain: false,
            }
        }
        _ => random_blob(rng),
    }
}

fn mutate_json_object(map: &serde_json::Map<String, Value>, rng: &mut impl Rng) -> Mutation {
    if rng.random_range(0..10) == 0 {
        return random_blob(rng);
    }
    let mut out = map.clone();
    if let Some(key) = out.keys().nth(rng.random_range(0..out.len().max(1))).cloned() {
        match rng.random_range(0..5) {
            0 => {
                let shortened = key[..floor_char_boundary(&key, key.len() / 2)].to_string();
                if let Some(v) = out.remove(&key) {
                    out.insert(shortened, v);
                }
            }
            1 => {
                let doubled = key.repeat(2);
                if let Some(v) = out.remove(&key) {
                    out.insert(doubled, v);
                }
            }
            2 => {
                if let Some(v) = out.remove(&key) {
                    out.insert(format!("field-{}", rng.random::<u32>()), v);
                }
            }
            3 => {
                out.remove(&key);
            }
            _ => {
                if let Some(v) = out.get_mut(&key) {
                    *v = perturb_json_value(v, rng);
                }
            }
        }
    }
    Mutation::text(Value::Object(out).to_string(), true)
}

fn mutate_json_array(items: &[Value], rng: &mut impl Rng) -> Mutation {
    if rng.random_range(0..10) == 0 {
        return random_blob(rng);
    }
    let mut out = items.to_vec();
    if !out.is_empty() {
        let idx = rng.random_range(0..out.len());
        match rng.random_range(0..4) {
            0 => {}
            1 => out[idx] = perturb_json_value(&out[idx], rng),
            2 => out[idx] = Value::from(rng.random::<i64>()),
            _ => {
                out.remove(idx);
            }
        }
    }
    Mutation::text(Value::Array(out).to_string(), true)
}

fn perturb_json_value(value: &Value, rng: &mut impl Rng) -> Value {
    match value {
        Value::Number(n) if n.is_i64() => Value::from(n.as_i64().unwrap_or(0).wrapping_mul(2)),
        Value::Number(n) => Value::from(n.as_f64().unwrap_or(0.0) * 2.0),
        Value::Bool(b) => Value::Bool(!b),
        Value::String(s) => Value::String(s.repeat(2)),
        Value::Null => Value::from(rng.random::<i64>()),
        other => other.clone(),
    }
}

fn mutate_xml(text: &str, rng: &mut impl Rng) -> Mutation {
    if let Ok(fields) = interoperable::parse_xml(text.as_bytes()) {
        if !fields.is_empty() {
            let idx = rng.random_range(0..fields.len());
            let mut fields = fields;
            fields[idx] = mutate_interoperable_field(fields[idx].clone(), rng);
            let rebuilt = interoperable::render(&fields, None);
            return Mutation {
                payload: rebuilt,
                retain: true,
            };
        }
    }
    Mutation::text(structural_fuzz(text, rng), true)
}

fn mutate_interoperable_field(mut field: InteroperableField, rng: &mut impl Rng) -> InteroperableField {
    field.value = match field.value {
        FieldValue::Boolean(b) => FieldValue::Boolean(!b),
        FieldValue::Int32(i) => FieldValue::Int32(i.wrapping_mul(2)),
        FieldValue::Int64(i) => FieldValue::Int64(i.wrapping_mul(2)),
        FieldValue::Quantity {
            magnitude,
            decimals,
            unit,
        } => FieldValue::Quantity {
            magnitude: magnitude * 2.0,
            decimals,
            unit,
        },
        FieldValue::DateTime(dt) => {
            FieldValue::DateTime(dt + chrono::Duration::days(rng.random_range(-30..30)))
        }
        FieldValue::Enum { value, data_type } => FieldValue::Enum {
            value: format!("{value}-mutated"),
            data_type,
        },
        other => other,
    };
    if field.field_type == FieldType::Identity {
        field.field_type = FieldType::Computed;
    }
    field
}

/// Renames one element's local name by a random transform, without
/// attempting to parse the document as well-formed XML at all — this is
/// the fallback path for documents that are not interoperable payloads.
fn structural_fuzz(text: &str, rng: &mut impl Rng) -> String {
    let Some(tag_start) = text.find('<') else {
        return text.to_string();
    };
    let after = &text[tag_start + 1..];
    let tag_end = after
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(after.len());
    let tag = &after[..tag_end];
    if tag.is_empty() || tag.starts_with('?') || tag.starts_with('!') {
        return text.to_string();
    }
    let mutated_tag = match rng.random_range(0..3) {
        0 => tag[..floor_char_boundary(tag, tag.len() / 2)].to_string(),
        1 => tag.repeat(2),
        _ => format!("x{}", rng.random::<u16>()),
    };
    text.replacen(tag, &mutated_tag, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::troll::classify::classify;
    use rand::SeedableRng;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(7)
    }

    #[test]
    fn integer_mutation_always_produces_some_payload() {
        let mut r = rng();
        let class = classify(b"100");
        let mutation = mutate(&class, &mut r);
        assert!(!mutation.payload.is_empty());
    }

    #[test]
    fn xml_interoperable_mutation_stays_parseable() {
        let mut r = rng();
        let fields = vec![InteroperableField::new(
            "n",
            Utc::now(),
            "Flag",
            FieldValue::Boolean(true),
            FieldType::Status,
        )];
        let xml = interoperable::render(&fields, None);
        let class = classify(&xml);
        let mutation = mutate(&class, &mut r);
        assert!(interoperable::parse_xml(&mutation.payload).is_ok());
    }

    #[test]
    fn blob_mutation_changes_length_or_content() {
        let mut r = rng();
        let original = vec![1u8, 2, 3, 4];
        let class = classify(&original);
        let mutation = mutate(&class, &mut r);
        assert!(mutation.payload != original || mutation.payload.len() != original.len());
    }

    #[test]
    fn floor_char_boundary_never_lands_inside_a_multibyte_char() {
        let s = "\u{1F980}abc";
        assert_eq!(floor_char_boundary(s, s.len() / 2), 0);
        assert_eq!(floor_char_boundary(s, 0), 0);
        assert_eq!(floor_char_boundary(s, s.len()), s.len());
    }

    #[test]
    fn string_mutation_never_panics_on_multibyte_midpoint() {
        let class = classify("\u{1F980}\u{1F980}\u{1F980}".as_bytes());
        for seed in 0..200 {
            let mut r = rand::rngs::StdRng::seed_from_u64(seed);
            let _ = mutate(&class, &mut r);
        }
    }

    #[test]
    fn json_object_mutation_never_panics_on_multibyte_key_midpoint() {
        let mut map = serde_json::Map::new();
        map.insert("\u{1F980}\u{1F980}\u{1F980}".to_string(), Value::from(1));
        let class = PayloadClass::JsonObject(map);
        for seed in 0..200 {
            let mut r = rand::rngs::StdRng::seed_from_u64(seed);
            let _ = mutate(&class, &mut r);
        }
    }
}
