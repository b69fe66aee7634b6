//! Error taxonomy for the core crate.
//!
//! Per the error handling design, malformed-input and cryptographic failures
//! observed on the *receive* path are never propagated as hard errors across
//! the MQTT callback boundary — callers map an `Err` here to a silent drop.
//! These types exist so the drop reason is still inspectable in logs.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    #[error("signature verification failed")]
    SignatureInvalid,
    #[error("invalid base64url encoding: {0}")]
    InvalidBase64(String),
    #[error("decryption failed")]
    DecryptionFailed,
}

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("settings store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("corrupted identity record: {0}")]
    Corrupted(String),
}

#[derive(Debug, Error)]
pub enum PairingError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("record exceeds maximum size")]
    Oversize,
    #[error("record contains unknown key: {0}")]
    UnknownKey(String),
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("malformed json: {0}")]
    Malformed(String),
    #[error("candidate key or id exceeds length cap")]
    CandidateTooLong,
    #[error(transparent)]
    Mqtt(#[from] MqttError),
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("payload exceeds maximum size")]
    Oversize,
    #[error("expected exactly one Signature field, found {0}")]
    SignatureCount(usize),
    #[error("ciphertext too short")]
    FrameTooShort,
    #[error("empty ciphertext")]
    EmptyCiphertext,
    #[error("signature exceeds maximum encoded length")]
    SignatureTooLong,
    #[error("xml error: {0}")]
    Xml(String),
    #[error(transparent)]
    Mqtt(#[from] MqttError),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum MqttError {
    #[error("not connected to broker")]
    NotConnected,
    #[error("publish failed: {0}")]
    PublishFailed(String),
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),
}
