//! Media stores.

#[cfg(feature = "media-cloudinary")]
mod cloudinary;
#[cfg(feature = "media-local")]
mod local;
mod memory;

#[cfg(feature = "media-cloudinary")]
pub use cloudinary::CloudinaryMediaStore;
#[cfg(feature = "media-local")]
pub use local::LocalMediaStore;
pub use memory::MemoryMediaStore;

/// Lower-cased extension of an uploaded file name, if it has one.
fn extension_of(file_name: &str) -> Option<String> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}
