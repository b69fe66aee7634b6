//! Domain model and protocol logic for HardenMQTT: a pedagogical
//! end-to-end security framework layered over a shared MQTT broker.
//!
//! This crate has no I/O. It depends only on the port traits in
//! [`ports`]; `hmq-infra` supplies concrete adapters and `hmq-app` wires
//! them together behind a CLI.

pub mod canonical;
pub mod crypto;
pub mod dispatcher;
pub mod error;
pub mod identity;
pub mod interoperable;
pub mod pairing;
pub mod ports;
pub mod reading;
pub mod settings_keys;
pub mod telemetry;
pub mod topics;
pub mod troll;

pub use identity::{DeviceIdentity, PeerBinding};
pub use reading::SensorReading;
