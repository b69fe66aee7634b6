//! Secure telemetry (spec §4.3): sign, encrypt, decrypt, and verify
//! interoperable XML payloads with the structural guards that keep a
//! malicious publisher from crashing a receiver.

use crate::canonical::interoperable;
use crate::crypto::{cipher, ecdh, encoding, kdf, signing};
use crate::error::TelemetryError;
use crate::identity::{DeviceIdentity, PeerBinding};
use crate::interoperable::InteroperableField;

/// Reject any payload above this size before attempting to parse it.
pub const MAX_PAYLOAD_BYTES: usize = 65536;
const MAX_SIGNATURE_B64_LEN: usize = 100;

/// Builds the `…/Secured/Public` payload: sign the canonical XML, then
/// rebuild it with the Signature field appended.
pub fn build_signed_public(
    identity: &DeviceIdentity,
    fields: &[InteroperableField],
) -> Result<Vec<u8>, TelemetryError> {
    let unsigned = interoperable::build_xml(fields)?;
    let signature = signing::sign(identity.signing_key(), &unsigned);
    let signature_b64 = encoding::encode(&signature);
    Ok(interoperable::build_signed_xml(fields, &signature_b64))
}

/// Builds the `…/Secured/Confidential` payload: sign as in
/// [`build_signed_public`], then encrypt the signed XML under the
/// ECDH-derived key shared with `peer`.
pub fn build_signed_confidential(
    identity: &DeviceIdentity,
    peer: &PeerBinding,
    fields: &[InteroperableField],
) -> Result<Vec<u8>, TelemetryError> {
    let signed_xml = build_signed_public(identity, fields)?;
    let shared_secret = ecdh::shared_secret(&identity.secret_bytes(), &peer.peer_public_key)?;
    let key = kdf::derive_aes_key(&shared_secret);
    let frame = cipher::encrypt(&key, &signed_xml);
    Ok(frame.to_bytes())
}

/// Verifies a `…/Secured/Public` payload against `peer_public_key`, returning
/// the field list with the Signature field stripped.
pub fn verify_public(
    peer_public_key: &[u8],
    payload: &[u8],
) -> Result<Vec<InteroperableField>, TelemetryError> {
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(TelemetryError::Oversize);
    }
    let parsed = interoperable::parse_xml(payload)?;
    let (fields, signature_b64) = interoperable::split_signature(parsed)?;
    if signature_b64.len() > MAX_SIGNATURE_B64_LEN {
        return Err(TelemetryError::SignatureTooLong);
    }
    let unsigned = interoperable::build_xml(&fields)?;
    let signature = encoding::decode(&signature_b64)?;
    signing::verify(peer_public_key, &unsigned, &signature)?;
    Ok(fields)
}

/// Decrypts then verifies a `…/Secured/Confidential` payload.
pub fn verify_confidential(
    identity: &DeviceIdentity,
    peer: &PeerBinding,
    payload: &[u8],
) -> Result<Vec<InteroperableField>, TelemetryError> {
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(TelemetryError::Oversize);
    }
    if payload.len() < cipher::HEADER_LEN {
        return Err(TelemetryError::FrameTooShort);
    }
    if payload.len() == cipher::HEADER_LEN {
        return Err(TelemetryError::EmptyCiphertext);
    }
    let frame = cipher::EncryptedFrame::from_bytes(payload)?;
    let shared_secret = ecdh::shared_secret(&identity.secret_bytes(), &peer.peer_public_key)?;
    let key = kdf::derive_aes_key(&shared_secret);
    let plaintext = cipher::decrypt(&key, &frame)?;
    verify_public(&peer.peer_public_key, &plaintext)
}
