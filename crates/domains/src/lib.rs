//! # domains
//!
//! The central domain model and port definitions for YelpCamp.
//! Nothing in here performs I/O; adapters live in the `*-adapters` crates.

pub mod errors;
pub mod ids;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use ids::*;
pub use models::*;
pub use ports::*;
