//! ECDH key agreement over the long-lived Ed25519 identity, by projecting
//! the Edwards keypair onto its Curve25519 (X25519, Montgomery-form)
//! equivalent. This avoids maintaining a second keypair per device, matching
//! `DeviceIdentity` holding a single Ed25519 keypair.

use curve25519_dalek::edwards::CompressedEdwardsY;
use sha2::{Digest, Sha512};

use crate::error::CryptoError;

use super::signing::PUBLIC_KEY_LEN;

/// Derive the X25519 secret scalar from an Ed25519 signing key's 32-byte
/// seed: SHA-512 the seed, take the low half, clamp it per RFC 7748. This is
/// the same derivation `ed25519-dalek` performs internally to build its
/// "expanded" secret key, and matches the standard
/// `crypto_sign_ed25519_sk_to_curve25519` conversion.
pub fn x25519_secret_from_seed(seed: &[u8; 32]) -> [u8; 32] {
    let digest = Sha512::digest(seed);
    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&digest[0..32]);
    clamp_scalar(&mut scalar);
    scalar
}

fn clamp_scalar(scalar: &mut [u8; 32]) {
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
}

/// Convert an Ed25519 public key (an Edwards point) to its Montgomery
/// u-coordinate. Rejects points that do not decompress to a valid curve
/// point, which is how ill-formed peer keys are caught before any ECDH is
/// attempted.
pub fn x25519_public_from_ed25519(public_key: &[u8]) -> Result<[u8; 32], CryptoError> {
    let arr: [u8; PUBLIC_KEY_LEN] =
        public_key
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_LEN,
                actual: public_key.len(),
            })?;
    let edwards = CompressedEdwardsY(arr)
        .decompress()
        .ok_or(CryptoError::InvalidKeyLength {
            expected: PUBLIC_KEY_LEN,
            actual: public_key.len(),
        })?;
    Ok(edwards.to_montgomery().to_bytes())
}

/// ECDH between a local Ed25519 secret seed and a peer's Ed25519 public key,
/// producing a 32-byte shared secret. Fails if the peer key does not decode
/// to a valid curve point.
pub fn shared_secret(
    local_secret_seed: &[u8; 32],
    peer_public_key: &[u8],
) -> Result<[u8; 32], CryptoError> {
    let scalar = x25519_secret_from_seed(local_secret_seed);
    let peer_u = x25519_public_from_ed25519(peer_public_key)?;
    Ok(x25519_dalek::x25519(scalar, peer_u))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signing::generate_keypair;

    #[test]
    fn both_sides_derive_the_same_shared_secret() {
        let a = generate_keypair();
        let b = generate_keypair();

        let secret_ab = shared_secret(&a.to_bytes(), &b.verifying_key().to_bytes()).unwrap();
        let secret_ba = shared_secret(&b.to_bytes(), &a.verifying_key().to_bytes()).unwrap();

        assert_eq!(secret_ab, secret_ba);
    }

    #[test]
    fn rejects_ill_formed_peer_key() {
        let a = generate_keypair();
        let garbage = [0xFFu8; 32];
        assert!(shared_secret(&a.to_bytes(), &garbage).is_err());
    }
}
