//! Canonical encoding (spec §4.1): the two deterministic byte/text renderings
//! that pairing and telemetry sign over, so two independent implementations
//! produce identical bytes given identical data.

pub mod interoperable;
pub mod pairing;
