//! Wire shape of a pairing record (spec §2, §4.2): the JSON object published
//! and progressively filled in under `HardenMqtt/Pairing/#` while two devices
//! negotiate a peer binding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PairingError;

/// Hard cap on the encoded record size, rejected before any JSON parsing.
pub const MAX_RECORD_BYTES: usize = 1000;

const ALLOWED_KEYS: &[&str] = &[
    "Nonce",
    "MasterPublicKey",
    "MasterId",
    "MasterType",
    "MasterSignature",
    "SlavePublicKey",
    "SlaveId",
    "SlaveType",
    "SlaveSignature",
    "Completed",
    "MasterCompleted",
    "SlaveCompleted",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairingRecord {
    #[serde(rename = "Nonce", default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(
        rename = "MasterPublicKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub master_public_key: Option<String>,
    #[serde(rename = "MasterId", default, skip_serializing_if = "Option::is_none")]
    pub master_id: Option<String>,
    #[serde(
        rename = "MasterType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub master_type: Option<String>,
    #[serde(
        rename = "MasterSignature",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub master_signature: Option<String>,
    #[serde(
        rename = "SlavePublicKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub slave_public_key: Option<String>,
    #[serde(rename = "SlaveId", default, skip_serializing_if = "Option::is_none")]
    pub slave_id: Option<String>,
    #[serde(rename = "SlaveType", default, skip_serializing_if = "Option::is_none")]
    pub slave_type: Option<String>,
    #[serde(
        rename = "SlaveSignature",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub slave_signature: Option<String>,
}

impl PairingRecord {
    /// True once the master half (public key, id, type, signature) is filled.
    pub fn master_completed(&self) -> bool {
        non_empty(&self.master_public_key)
            && non_empty(&self.master_id)
            && non_empty(&self.master_type)
            && non_empty(&self.master_signature)
    }

    /// True once the slave half is filled.
    pub fn slave_completed(&self) -> bool {
        non_empty(&self.slave_public_key)
            && non_empty(&self.slave_id)
            && non_empty(&self.slave_type)
            && non_empty(&self.slave_signature)
    }

    pub fn completed(&self) -> bool {
        self.master_completed() && self.slave_completed()
    }
}

fn non_empty(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.is_empty())
}

/// Parses a pairing record, enforcing the size cap and rejecting any key
/// outside the fixed schema. `Completed`/`MasterCompleted`/`SlaveCompleted`
/// are accepted on the wire (other implementations may echo them back) but
/// are derived, never stored.
pub fn parse_strict(bytes: &[u8]) -> Result<PairingRecord, PairingError> {
    if bytes.len() > MAX_RECORD_BYTES {
        return Err(PairingError::Oversize);
    }
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| PairingError::Malformed(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| PairingError::Malformed("expected a JSON object".into()))?;
    for key in obj.keys() {
        if !ALLOWED_KEYS.contains(&key.as_str()) {
            return Err(PairingError::UnknownKey(key.clone()));
        }
    }
    serde_json::from_value(value).map_err(|e| PairingError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_predicates_require_all_four_fields_per_side() {
        let mut record = PairingRecord::default();
        assert!(!record.master_completed());

        record.master_public_key = Some("pk".into());
        record.master_id = Some("id".into());
        record.master_type = Some("Sensor".into());
        assert!(!record.master_completed());

        record.master_signature = Some("sig".into());
        assert!(record.master_completed());
        assert!(!record.completed());
    }

    #[test]
    fn parse_strict_rejects_unknown_keys() {
        let bytes = br#"{"Nonce":"abc","Evil":"1"}"#;
        assert!(matches!(
            parse_strict(bytes),
            Err(PairingError::UnknownKey(_))
        ));
    }

    #[test]
    fn parse_strict_accepts_derived_predicates_without_storing_them() {
        let bytes = br#"{"Nonce":"abc","Completed":false,"MasterCompleted":false,"SlaveCompleted":false}"#;
        let record = parse_strict(bytes).unwrap();
        assert_eq!(record.nonce.as_deref(), Some("abc"));
    }

    #[test]
    fn parse_strict_rejects_oversize_input() {
        let padded = format!(r#"{{"Nonce":"{}"}}"#, "a".repeat(MAX_RECORD_BYTES));
        assert!(matches!(
            parse_strict(padded.as_bytes()),
            Err(PairingError::Oversize)
        ));
    }
}
