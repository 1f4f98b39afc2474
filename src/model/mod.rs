//! Core data model: decoded message records and attachment parts.

pub mod attachment;
pub mod record;
