//! # storage-adapters
//!
//! Implementations of the `CampgroundRepository` and `MediaStore` ports.
//!
//! The in-memory adapters are always compiled; PostgreSQL, the local
//! filesystem and Cloudinary sit behind cargo features so a binary only links
//! what it is built for.

pub mod media;
pub mod repository;

pub use media::MemoryMediaStore;
pub use repository::MemoryCampgroundRepository;

#[cfg(feature = "media-cloudinary")]
pub use media::CloudinaryMediaStore;
#[cfg(feature = "media-local")]
pub use media::LocalMediaStore;
#[cfg(feature = "db-postgres")]
pub use repository::PgCampgroundRepository;
