//! Persistent settings key names (spec §6). The store itself is a flat
//! string key/value map behind `SettingsStorePort`; these are the keys every
//! adapter and usecase must agree on.

pub const DEVICE_ID: &str = "Device.ID";
/// Base64Url of the Ed25519 secret scalar.
pub const ED25519_SECRET: &str = "ed25519.p";
pub const PAIR_ED25519_PUBLIC: &str = "Pair.Ed25519.Public";
pub const PAIR_ID: &str = "Pair.Id";
pub const MQTT_HOST: &str = "MQTT.Host";
pub const MQTT_PORT: &str = "MQTT.Port";
pub const MQTT_TLS: &str = "MQTT.Tls";
pub const MQTT_USERNAME: &str = "MQTT.UserName";
pub const MQTT_PASSWORD: &str = "MQTT.Password";
pub const MQTT_TRUST_SERVER: &str = "MQTT.TrustServer";
