//! Domain layer types and invariants.

pub mod content;
pub mod relations;
pub mod types;
