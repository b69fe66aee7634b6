//! Device identity and peer binding domain models.

use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::crypto::encoding;

/// Long-lived Ed25519 identity for a single device. Created once on first
/// run and persisted in the settings store keyed by a stable name (spec §3).
#[derive(Clone)]
pub struct DeviceIdentity {
    signing_key: SigningKey,
    pub device_id: String,
    pub device_type: String,
}

impl DeviceIdentity {
    pub fn generate(device_id: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            signing_key: crate::crypto::signing::generate_keypair(),
            device_id: device_id.into(),
            device_type: device_type.into(),
        }
    }

    pub fn from_secret_bytes(secret: [u8; 32], device_id: String, device_type: String) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&secret),
            device_id,
            device_type,
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key().to_bytes()
    }

    /// Base64Url-encoded public key, safe to embed in an MQTT topic segment.
    pub fn public_key_base64url(&self) -> String {
        encoding::encode(&self.public_key_bytes())
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl std::fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("device_id", &self.device_id)
            .field("device_type", &self.device_type)
            .field("public_key", &self.public_key_base64url())
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

/// Result of a completed pairing: the peer's identity, by value. Presence
/// indicates "paired" state; absence triggers `PairingEngine` on startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerBinding {
    pub peer_public_key: Vec<u8>,
    pub peer_device_id: String,
}

impl PeerBinding {
    pub fn peer_public_key_base64url(&self) -> String {
        encoding::encode(&self.peer_public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_base64url_is_topic_safe() {
        let identity = DeviceIdentity::generate("sensor-1", "Sensor");
        let encoded = identity.public_key_base64url();
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('#'));
    }

    #[test]
    fn from_secret_bytes_reconstructs_same_public_key() {
        let original = DeviceIdentity::generate("sensor-1", "Sensor");
        let secret = original.secret_bytes();
        let restored =
            DeviceIdentity::from_secret_bytes(secret, "sensor-1".into(), "Sensor".into());
        assert_eq!(original.public_key_bytes(), restored.public_key_bytes());
    }
}
