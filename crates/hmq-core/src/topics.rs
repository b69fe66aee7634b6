//! MQTT topic namespace (spec §6). All topics live under the fixed
//! `HardenMqtt/` root; builders substitute the device ID or Base64Url public
//! key segment.

pub const ROOT: &str = "HardenMqtt";
pub const PAIRING: &str = "HardenMqtt/Pairing";
pub const EVENTS: &str = "HardenMqtt/Events";
/// Subscription filter used by the troll to observe the whole broker.
pub const WILDCARD_ALL: &str = "#";

pub fn unstructured(device_id: &str, field: &str) -> String {
    format!("HardenMqtt/Unsecured/Unstructured/{device_id}/{field}")
}

pub fn structured(device_id: &str) -> String {
    format!("HardenMqtt/Unsecured/Structured/{device_id}")
}

pub fn interoperable(device_id: &str) -> String {
    format!("HardenMqtt/Unsecured/Interoperable/{device_id}")
}

pub fn secured_public(public_key_base64url: &str) -> String {
    format!("HardenMqtt/Secured/Public/{public_key_base64url}")
}

pub fn secured_confidential(public_key_base64url: &str) -> String {
    format!("HardenMqtt/Secured/Confidential/{public_key_base64url}")
}

/// True for any topic this process itself may legitimately publish to as
/// telemetry, used by the troll to decide what `#` delivers is fair game.
/// The event log is excluded so pedagogical output stays legible (spec §4.4).
pub fn is_troll_eligible(topic: &str) -> bool {
    topic != EVENTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_produce_the_documented_literal_topics() {
        assert_eq!(
            unstructured("sensor-1", "Temperature"),
            "HardenMqtt/Unsecured/Unstructured/sensor-1/Temperature"
        );
        assert_eq!(structured("sensor-1"), "HardenMqtt/Unsecured/Structured/sensor-1");
        assert_eq!(
            interoperable("sensor-1"),
            "HardenMqtt/Unsecured/Interoperable/sensor-1"
        );
        assert_eq!(
            secured_public("abc123"),
            "HardenMqtt/Secured/Public/abc123"
        );
        assert_eq!(
            secured_confidential("abc123"),
            "HardenMqtt/Secured/Confidential/abc123"
        );
    }

    #[test]
    fn events_topic_is_not_troll_eligible() {
        assert!(!is_troll_eligible(EVENTS));
        assert!(is_troll_eligible(PAIRING));
    }
}
