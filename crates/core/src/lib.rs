//! Domain types and pure computations for the pressure staging service.

pub mod error;
pub mod measurement;
pub mod pressure;
pub mod types;
