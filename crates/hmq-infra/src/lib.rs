//! Concrete adapters implementing `hmq_core::ports`: a `rumqttc`-backed
//! `MqttPort`, a file-backed `KeystorePort` and `SettingsStorePort`, and a
//! dedicated-thread console `PairingPromptPort`.

pub mod keystore;
pub mod mqtt;
pub mod prompt;
pub mod settings_store;

pub use keystore::FileKeystore;
pub use mqtt::{MqttConfig, RumqttcMqttPort};
pub use prompt::ConsolePrompt;
pub use settings_store::TomlSettingsStore;
