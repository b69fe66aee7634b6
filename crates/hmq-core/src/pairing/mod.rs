//! Device pairing (spec §4.2): a broker-mediated Ed25519 identity exchange
//! with no trusted out-of-band channel.

pub mod engine;
pub mod record;

pub use engine::{pair, PairingOutcome, PairingRole};
pub use record::PairingRecord;
