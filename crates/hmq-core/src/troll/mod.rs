//! The troll mutator (spec §4.4): a pedagogical man-in-the-middle that
//! republishes a perturbed variant of whatever it observes, to demonstrate
//! why the Secured/* topics exist.

pub mod classify;
pub mod digest_cache;
pub mod engine;
pub mod mutate;

pub use classify::{classify, PayloadClass};
pub use engine::run;
pub use mutate::{mutate, Mutation};
