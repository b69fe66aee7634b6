//! Demultiplexes the flat MQTT topic namespace into a typed route (spec §4
//! table, "Receiver Dispatcher").

use crate::topics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicRoute {
    Unstructured { device_id: String, field: String },
    Structured { device_id: String },
    Interoperable { device_id: String },
    SecuredPublic { public_key_base64url: String },
    SecuredConfidential { public_key_base64url: String },
    Pairing,
    Events,
    Unrecognized,
}

pub fn classify_topic(topic: &str) -> TopicRoute {
    if topic == topics::PAIRING {
        return TopicRoute::Pairing;
    }
    if topic == topics::EVENTS {
        return TopicRoute::Events;
    }
    let parts: Vec<&str> = topic.split('/').collect();
    match parts.as_slice() {
        ["HardenMqtt", "Unsecured", "Unstructured", device_id, field] => TopicRoute::Unstructured {
            device_id: device_id.to_string(),
            field: field.to_string(),
        },
        ["HardenMqtt", "Unsecured", "Structured", device_id] => TopicRoute::Structured {
            device_id: device_id.to_string(),
        },
        ["HardenMqtt", "Unsecured", "Interoperable", device_id] => TopicRoute::Interoperable {
            device_id: device_id.to_string(),
        },
        ["HardenMqtt", "Secured", "Public", public_key] => TopicRoute::SecuredPublic {
            public_key_base64url: public_key.to_string(),
        },
        ["HardenMqtt", "Secured", "Confidential", public_key] => TopicRoute::SecuredConfidential {
            public_key_base64url: public_key.to_string(),
        },
        _ => TopicRoute::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_each_documented_topic_shape() {
        assert_eq!(
            classify_topic("HardenMqtt/Unsecured/Unstructured/sensor-1/Temperature"),
            TopicRoute::Unstructured {
                device_id: "sensor-1".into(),
                field: "Temperature".into()
            }
        );
        assert_eq!(
            classify_topic("HardenMqtt/Unsecured/Structured/sensor-1"),
            TopicRoute::Structured {
                device_id: "sensor-1".into()
            }
        );
        assert_eq!(
            classify_topic("HardenMqtt/Unsecured/Interoperable/sensor-1"),
            TopicRoute::Interoperable {
                device_id: "sensor-1".into()
            }
        );
        assert_eq!(
            classify_topic("HardenMqtt/Secured/Public/abc123"),
            TopicRoute::SecuredPublic {
                public_key_base64url: "abc123".into()
            }
        );
        assert_eq!(
            classify_topic("HardenMqtt/Secured/Confidential/abc123"),
            TopicRoute::SecuredConfidential {
                public_key_base64url: "abc123".into()
            }
        );
        assert_eq!(classify_topic(topics::PAIRING), TopicRoute::Pairing);
        assert_eq!(classify_topic(topics::EVENTS), TopicRoute::Events);
    }

    #[test]
    fn unrelated_or_malformed_topics_are_unrecognized() {
        assert_eq!(classify_topic("SomeOtherApp/foo"), TopicRoute::Unrecognized);
        assert_eq!(
            classify_topic("HardenMqtt/Unsecured/Unstructured/sensor-1"),
            TopicRoute::Unrecognized
        );
    }
}
