//! Secure telemetry pipeline (spec §4.3): signing, encryption, and the
//! mirror-image verify/decrypt path used on the publish and receive sides.

pub mod secure;

pub use secure::{
    build_signed_confidential, build_signed_public, verify_confidential, verify_public,
    MAX_PAYLOAD_BYTES,
};
