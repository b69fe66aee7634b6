//! Pairing canonicalization (spec §4.1).
//!
//! Concatenates the seven ordering-significant fields of a `PairingRecord`
//! with `|`, substituting the empty string for absent fields. Signatures and
//! the derived `Completed`/`MasterCompleted`/`SlaveCompleted` predicates are
//! excluded — they can never affect the signable bytes.

use crate::pairing::record::PairingRecord;

pub fn signable_bytes(record: &PairingRecord) -> Vec<u8> {
    let parts = [
        record.nonce.as_deref().unwrap_or(""),
        record.master_public_key.as_deref().unwrap_or(""),
        record.master_id.as_deref().unwrap_or(""),
        record.master_type.as_deref().unwrap_or(""),
        record.slave_public_key.as_deref().unwrap_or(""),
        record.slave_id.as_deref().unwrap_or(""),
        record.slave_type.as_deref().unwrap_or(""),
    ];
    parts.join("|").into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic_and_field_order_fixed() {
        let mut record = PairingRecord::default();
        record.nonce = Some("n".into());
        record.master_public_key = Some("mpk".into());
        record.master_id = Some("mid".into());
        record.master_type = Some("Sensor".into());
        record.slave_public_key = Some("spk".into());
        record.slave_id = Some("sid".into());
        record.slave_type = Some("Display".into());

        assert_eq!(signable_bytes(&record), b"n|mpk|mid|Sensor|spk|sid|Display");
    }

    #[test]
    fn absent_fields_become_empty_segments() {
        let record = PairingRecord {
            nonce: Some("n".into()),
            ..Default::default()
        };
        assert_eq!(signable_bytes(&record), b"n||||||");
    }

    #[test]
    fn signatures_and_derived_predicates_never_affect_bytes() {
        let mut without_sig = PairingRecord::default();
        without_sig.nonce = Some("n".into());
        without_sig.master_public_key = Some("mpk".into());

        let mut with_sig = without_sig.clone();
        with_sig.master_signature = Some("sig-data".into());
        with_sig.slave_signature = Some("other-sig".into());

        assert_eq!(signable_bytes(&without_sig), signable_bytes(&with_sig));
    }
}
