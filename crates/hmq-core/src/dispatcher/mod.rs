//! Receiver Dispatcher (spec §4 table): demultiplexes the topic namespace,
//! routes each message to the matching presentation/verification path, and
//! tracks a stable console row per topic. Pure domain logic — no MQTT I/O,
//! no printing; `hmq-app` turns a `Presented` into terminal output.

mod route;
mod row;

use crate::canonical::interoperable;
use crate::crypto::encoding;
use crate::identity::{DeviceIdentity, PeerBinding};
use crate::interoperable::InteroperableField;
use crate::ports::IncomingMessage;
use crate::reading::SensorReading;
use crate::telemetry;

pub use route::{classify_topic, TopicRoute};
pub use row::RowTracker;

#[derive(Debug, Clone, PartialEq)]
pub enum Presented {
    Unstructured {
        row: usize,
        device_id: String,
        field: String,
        raw: String,
    },
    Structured {
        row: usize,
        device_id: String,
        reading: SensorReading,
    },
    Interoperable {
        row: usize,
        device_id: String,
        fields: Vec<InteroperableField>,
    },
    SecuredPublic {
        row: usize,
        fields: Vec<InteroperableField>,
    },
    SecuredConfidential {
        row: usize,
        fields: Vec<InteroperableField>,
    },
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    rows: RowTracker,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes one inbound message. Returns `None` for anything this
    /// receiver does not present: pairing/event traffic, an unrecognized
    /// topic, a parse failure, or a signature/decryption failure — all
    /// silent drops per spec §7.
    pub fn dispatch(
        &mut self,
        identity: &DeviceIdentity,
        peer: Option<&PeerBinding>,
        message: &IncomingMessage,
    ) -> Option<Presented> {
        match classify_topic(&message.topic) {
            TopicRoute::Unstructured { device_id, field } => {
                let raw = String::from_utf8(message.payload.clone()).ok()?;
                let row = self.rows.row_for(&message.topic);
                Some(Presented::Unstructured {
                    row,
                    device_id,
                    field,
                    raw,
                })
            }
            TopicRoute::Structured { device_id } => {
                let reading: SensorReading = serde_json::from_slice(&message.payload).ok()?;
                let row = self.rows.row_for(&message.topic);
                Some(Presented::Structured {
                    row,
                    device_id,
                    reading,
                })
            }
            TopicRoute::Interoperable { device_id } => {
                let fields = interoperable::parse_xml(&message.payload).ok()?;
                let row = self.rows.row_for(&message.topic);
                Some(Presented::Interoperable {
                    row,
                    device_id,
                    fields,
                })
            }
            TopicRoute::SecuredPublic {
                public_key_base64url,
            } => {
                let peer = peer?;
                if peer.peer_public_key_base64url() != public_key_base64url {
                    return None;
                }
                let decoded = encoding::decode(&public_key_base64url).ok()?;
                let fields = telemetry::verify_public(&decoded, &message.payload).ok()?;
                let row = self.rows.row_for(&message.topic);
                Some(Presented::SecuredPublic { row, fields })
            }
            TopicRoute::SecuredConfidential {
                public_key_base64url,
            } => {
                let peer = peer?;
                if peer.peer_public_key_base64url() != public_key_base64url {
                    return None;
                }
                let fields = telemetry::verify_confidential(identity, peer, &message.payload).ok()?;
                let row = self.rows.row_for(&message.topic);
                Some(Presented::SecuredConfidential { row, fields })
            }
            TopicRoute::Pairing | TopicRoute::Events | TopicRoute::Unrecognized => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interoperable::{FieldType, FieldValue};
    use crate::topics;
    use chrono::Utc;

    fn sample_fields() -> Vec<InteroperableField> {
        vec![InteroperableField::new(
            "sensor-1",
            Utc::now(),
            "Temperature",
            FieldValue::Quantity {
                magnitude: 21.5,
                decimals: 1,
                unit: "C".into(),
            },
            FieldType::Momentary,
        )]
    }

    #[test]
    fn unstructured_message_presents_raw_string_on_a_stable_row() {
        let identity = DeviceIdentity::generate("display-1", "Display");
        let mut dispatcher = Dispatcher::new();
        let message = IncomingMessage {
            topic: topics::unstructured("sensor-1", "Temperature"),
            payload: b"21.5 \xc2\xb0C".to_vec(),
        };

        let first = dispatcher.dispatch(&identity, None, &message).unwrap();
        let second = dispatcher.dispatch(&identity, None, &message).unwrap();
        match (first, second) {
            (Presented::Unstructured { row: r1, .. }, Presented::Unstructured { row: r2, .. }) => {
                assert_eq!(r1, r2);
            }
            other => panic!("unexpected presentation: {other:?}"),
        }
    }

    #[test]
    fn structured_message_parses_into_a_sensor_reading() {
        let identity = DeviceIdentity::generate("display-1", "Display");
        let mut dispatcher = Dispatcher::new();
        let reading_json = serde_json::json!({
            "TemperatureCelcius": 21.5,
            "Readout": Utc::now().to_rfc3339(),
            "Timestamp": Utc::now().to_rfc3339(),
            "Name": "Backyard",
            "Id": "sensor-1",
            "Country": "NO",
            "TimeZone": "Europe/Oslo",
        });
        let message = IncomingMessage {
            topic: topics::structured("sensor-1"),
            payload: serde_json::to_vec(&reading_json).unwrap(),
        };

        let presented = dispatcher.dispatch(&identity, None, &message).unwrap();
        assert!(matches!(presented, Presented::Structured { .. }));
    }

    #[test]
    fn interoperable_message_parses_without_a_signature() {
        let identity = DeviceIdentity::generate("display-1", "Display");
        let mut dispatcher = Dispatcher::new();
        let xml = interoperable::build_xml(&sample_fields()).unwrap();
        let message = IncomingMessage {
            topic: topics::interoperable("sensor-1"),
            payload: xml,
        };

        let presented = dispatcher.dispatch(&identity, None, &message).unwrap();
        assert!(matches!(presented, Presented::Interoperable { .. }));
    }

    #[test]
    fn secured_public_requires_a_matching_paired_peer() {
        let sensor = DeviceIdentity::generate("sensor-1", "Sensor");
        let display = DeviceIdentity::generate("display-1", "Display");
        let mut dispatcher = Dispatcher::new();

        let payload = telemetry::build_signed_public(&sensor, &sample_fields()).unwrap();
        let message = IncomingMessage {
            topic: topics::secured_public(&sensor.public_key_base64url()),
            payload,
        };

        assert!(dispatcher.dispatch(&display, None, &message).is_none());

        let peer = PeerBinding {
            peer_public_key: sensor.public_key_bytes().to_vec(),
            peer_device_id: sensor.device_id.clone(),
        };
        let presented = dispatcher.dispatch(&display, Some(&peer), &message).unwrap();
        assert!(matches!(presented, Presented::SecuredPublic { .. }));
    }

    #[test]
    fn secured_confidential_drops_when_topic_key_does_not_match_paired_peer() {
        let sensor = DeviceIdentity::generate("sensor-1", "Sensor");
        let imposter = DeviceIdentity::generate("imposter", "Sensor");
        let display = DeviceIdentity::generate("display-1", "Display");
        let mut dispatcher = Dispatcher::new();

        let display_sees_imposter = PeerBinding {
            peer_public_key: imposter.public_key_bytes().to_vec(),
            peer_device_id: imposter.device_id.clone(),
        };
        let display_sees_sensor = PeerBinding {
            peer_public_key: sensor.public_key_bytes().to_vec(),
            peer_device_id: sensor.device_id.clone(),
        };
        let sensor_sees_display = PeerBinding {
            peer_public_key: display.public_key_bytes().to_vec(),
            peer_device_id: display.device_id.clone(),
        };
        let payload =
            telemetry::build_signed_confidential(&sensor, &sensor_sees_display, &sample_fields())
                .unwrap();
        let message = IncomingMessage {
            topic: topics::secured_confidential(&sensor.public_key_base64url()),
            payload,
        };

        assert!(dispatcher
            .dispatch(&display, Some(&display_sees_imposter), &message)
            .is_none());
        assert!(dispatcher
            .dispatch(&display, Some(&display_sees_sensor), &message)
            .is_some());
    }
}
