//! Interoperable field model: a typed tuple of (thing reference, timestamp,
//! name, value, field-type, QoS tag), rendered to the XMPP-style
//! sensor-data XML form by `crate::canonical::interoperable`.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Field name reserved for the appended signature. MUST NOT appear in
/// caller-supplied input to signing (spec §3).
pub const SIGNATURE_FIELD_NAME: &str = "Signature";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Momentary,
    Peak,
    Status,
    Identity,
    Computed,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Momentary => "momentary",
            FieldType::Peak => "peak",
            FieldType::Status => "status",
            FieldType::Identity => "identity",
            FieldType::Computed => "computed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "momentary" => Some(FieldType::Momentary),
            "peak" => Some(FieldType::Peak),
            "status" => Some(FieldType::Status),
            "identity" => Some(FieldType::Identity),
            "computed" => Some(FieldType::Computed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Str(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    /// ISO-8601 duration string, e.g. `PT1H30M`.
    Duration(String),
    Time(NaiveTime),
    Quantity {
        magnitude: f64,
        decimals: u8,
        unit: String,
    },
    Enum {
        value: String,
        data_type: String,
    },
}

impl FieldValue {
    /// XEP-0323-style element local name for this variant.
    pub fn element_name(&self) -> &'static str {
        match self {
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Int32(_) => "int",
            FieldValue::Int64(_) => "long",
            FieldValue::Str(_) => "string",
            FieldValue::Date(_) => "date",
            FieldValue::DateTime(_) => "dateTime",
            FieldValue::Duration(_) => "duration",
            FieldValue::Time(_) => "time",
            FieldValue::Quantity { .. } => "numeric",
            FieldValue::Enum { .. } => "enum",
        }
    }
}

/// A single typed telemetry field plus its provenance metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct InteroperableField {
    /// Thing reference (node/device identifier the reading belongs to).
    pub node_id: String,
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub value: FieldValue,
    pub field_type: FieldType,
}

impl InteroperableField {
    pub fn new(
        node_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        name: impl Into<String>,
        value: FieldValue,
        field_type: FieldType,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            timestamp,
            name: name.into(),
            value,
            field_type,
        }
    }
}
