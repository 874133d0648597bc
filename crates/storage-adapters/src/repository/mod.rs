//! Campground repositories.

mod memory;
#[cfg(feature = "db-postgres")]
mod postgres;

pub use memory::MemoryCampgroundRepository;
#[cfg(feature = "db-postgres")]
pub use postgres::PgCampgroundRepository;
