//! Base64Url (no padding) encoding, used wherever a key or signature must
//! appear inside an MQTT topic segment (no `/`, `+`, `#`).

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::error::CryptoError;

pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| CryptoError::InvalidBase64(e.to_string()))
}
