//! # services
//!
//! Application services orchestrating the domain ports.

pub mod campgrounds;
pub mod guard;

pub use campgrounds::CampgroundService;
pub use guard::OwnershipGuard;
