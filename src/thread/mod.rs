//! Thread reconstruction: subject keys, the reference index, chain assembly
//! and chronological ordering.
//!
//! Everything here is pure computation over an already decoded record
//! slice. All intermediate state lives inside a single [`assemble`] call.

pub mod assembler;
pub mod index;
pub mod order;
pub mod subject;

pub use assembler::{assemble, Chain, Conversation};
