//! Cryptographic primitives used by pairing and secure telemetry:
//! Ed25519 signing, ECDH key agreement, key derivation, and AES-256-CBC
//! framing, plus the Base64Url encoding used in topic segments.

pub mod cipher;
pub mod ecdh;
pub mod encoding;
pub mod kdf;
pub mod signing;

pub use cipher::EncryptedFrame;
