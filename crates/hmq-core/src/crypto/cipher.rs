//! AES-256-CBC framing for confidential telemetry.
//!
//! Frame layout: `IV(16) ‖ Nonce(16) ‖ Ciphertext(n)`. The nonce is not fed
//! into AES-CBC at all (spec §9, open question resolved: transport-only
//! entropy to diversify otherwise-identical plaintext/IV pairs).

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use crate::error::CryptoError;

pub const IV_LEN: usize = 16;
pub const NONCE_LEN: usize = 16;
pub const HEADER_LEN: usize = IV_LEN + NONCE_LEN;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

#[derive(Debug, Clone)]
pub struct EncryptedFrame {
    pub iv: [u8; IV_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

impl EncryptedFrame {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Structural guard: requires length > 32 and a non-empty ciphertext
    /// remainder (spec §4.3).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() <= HEADER_LEN {
            return Err(CryptoError::DecryptionFailed);
        }
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[0..IV_LEN]);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&bytes[IV_LEN..HEADER_LEN]);
        let ciphertext = bytes[HEADER_LEN..].to_vec();
        if ciphertext.is_empty() {
            return Err(CryptoError::DecryptionFailed);
        }
        Ok(Self {
            iv,
            nonce,
            ciphertext,
        })
    }
}

pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> EncryptedFrame {
    let mut iv = [0u8; IV_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    let mut rng = rand::rng();
    rng.fill_bytes(&mut iv);
    rng.fill_bytes(&mut nonce);

    let ciphertext =
        Aes256CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    EncryptedFrame {
        iv,
        nonce,
        ciphertext,
    }
}

pub fn decrypt(key: &[u8; 32], frame: &EncryptedFrame) -> Result<Vec<u8>, CryptoError> {
    Aes256CbcDec::new(key.into(), &frame.iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&frame.ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = [0x42u8; 32];
        let plaintext = b"confidential telemetry payload";
        let frame = encrypt(&key, plaintext);
        let decrypted = decrypt(&key, &frame).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_key_fails_padding_check() {
        let frame = encrypt(&[1u8; 32], b"some plaintext data of length");
        assert!(decrypt(&[2u8; 32], &frame).is_err());
    }

    #[test]
    fn identical_plaintexts_produce_distinct_frames() {
        let key = [9u8; 32];
        let a = encrypt(&key, b"same plaintext");
        let b = encrypt(&key, b"same plaintext");
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn from_bytes_rejects_short_header() {
        assert!(EncryptedFrame::from_bytes(&[0u8; HEADER_LEN]).is_err());
        assert!(EncryptedFrame::from_bytes(&[0u8; HEADER_LEN - 1]).is_err());
    }
}
