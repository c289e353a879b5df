//! Route tree.
//!
//! ```text
//! /health        GET   service health (public)
//! /calc          POST  queue a pressure computation
//!                OPTIONS answered by the CORS layer
//! ```

pub mod calc;
pub mod health;
