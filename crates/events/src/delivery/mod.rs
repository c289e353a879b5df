//! Delivery of results to the upstream main service.

pub mod config;
pub mod credentials;
pub mod upstream;
