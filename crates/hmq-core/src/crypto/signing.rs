//! Ed25519 signing over canonical bytes.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::CryptoError;

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SECRET_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

pub fn generate_keypair() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

pub fn sign(signing_key: &SigningKey, message: &[u8]) -> [u8; SIGNATURE_LEN] {
    signing_key.sign(message).to_bytes()
}

/// Verify `signature` over `message` against the declared `public_key`.
///
/// Any malformed key or signature is reported as `SignatureInvalid` (not a
/// distinct error) so callers at the receive boundary can treat all verify
/// failures identically, per the spec's "do not distinguish wrong peer from
/// corrupted payload" rule.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let vk = verifying_key_from_bytes(public_key).map_err(|_| CryptoError::SignatureInvalid)?;
    let sig = signature_from_bytes(signature).map_err(|_| CryptoError::SignatureInvalid)?;
    vk.verify(message, &sig)
        .map_err(|_| CryptoError::SignatureInvalid)
}

pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey, CryptoError> {
    let arr: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: PUBLIC_KEY_LEN,
        actual: bytes.len(),
    })?;
    VerifyingKey::from_bytes(&arr).map_err(|_| CryptoError::InvalidKeyLength {
        expected: PUBLIC_KEY_LEN,
        actual: bytes.len(),
    })
}

fn signature_from_bytes(bytes: &[u8]) -> Result<Signature, CryptoError> {
    let arr: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: SIGNATURE_LEN,
        actual: bytes.len(),
    })?;
    Ok(Signature::from_bytes(&arr))
}
