//! Port interfaces between core domain logic and infrastructure adapters
//! (spec §1, §6). Hexagonal architecture: `hmq-core` depends only on these
//! traits, `hmq-infra` provides concrete adapters, `hmq-app` wires them.

use async_trait::async_trait;

use crate::error::{KeystoreError, MqttError, SettingsError};
use crate::identity::{DeviceIdentity, PeerBinding};

/// A message observed on a subscribed topic.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// The external MQTT client contract (spec §6): publish/subscribe and a
/// stream of incoming messages on subscribed topics. QoS and retained-flag
/// policy live with the adapter, not the port.
#[async_trait]
pub trait MqttPort: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MqttError>;
    async fn subscribe(&self, topic_filter: &str) -> Result<(), MqttError>;
    /// Receiver side of the inbound message stream. Called once by the
    /// owning use case at startup.
    fn messages(&self) -> tokio::sync::mpsc::Receiver<IncomingMessage>;
}

/// Persists and loads the long-lived device identity and, once paired, the
/// peer binding (spec §3: first-run bootstrap, persisted keystore).
#[async_trait]
pub trait KeystorePort: Send + Sync {
    async fn load_or_create_identity(
        &self,
        device_id: &str,
        device_type: &str,
    ) -> Result<DeviceIdentity, KeystoreError>;
    async fn load_peer_binding(&self) -> Result<Option<PeerBinding>, KeystoreError>;
    async fn save_peer_binding(&self, binding: &PeerBinding) -> Result<(), KeystoreError>;
}

/// Flat string key/value persistence for the settings named in spec §6.
#[async_trait]
pub trait SettingsStorePort: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// A candidate counterpart observed while announcing, presented to the
/// operator when more than one is seen (spec §4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlaveCandidate {
    pub public_key_base64url: String,
    pub device_id: String,
}

/// Asks a human to pick among multiple pairing candidates. Returns `None`
/// if the operator declines to choose (pairing keeps waiting).
#[async_trait]
pub trait PairingPromptPort: Send + Sync {
    async fn select_slave(&self, candidates: &[SlaveCandidate]) -> Option<usize>;
}
