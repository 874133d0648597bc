//! # auth-adapters
//!
//! Implementations of the `IdentityVerifier` port. The web layer never learns
//! how a token is checked; it only receives an `Identity` or an error.

#[cfg(feature = "auth-jwt")]
pub mod jwt;

#[cfg(feature = "auth-jwt")]
pub use jwt::{JwtIdentityVerifier, DEFAULT_TOKEN_TTL};
