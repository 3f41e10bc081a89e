//! Infrastructure adapters and runtime bootstrap.

pub mod archive;
pub mod bootstrap;
pub mod error;
pub mod memory;
pub mod telemetry;
