//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.

use async_trait::async_trait;

use crate::errors::Result;
use crate::ids::{CampgroundId, MediaHandle, UserId};
use crate::models::{
    Campground, CampgroundDetail, Comment, Identity, Image, LikeToggle, MediaUpload, Review,
};

/// Data persistence contract for campgrounds and their dependents.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CampgroundRepository: Send + Sync {
    /// All campgrounds, oldest first.
    async fn list(&self) -> Result<Vec<Campground>>;

    async fn find(&self, id: CampgroundId) -> Result<Option<Campground>>;

    /// The campground with comments and reviews expanded, reviews newest first.
    async fn find_detail(&self, id: CampgroundId) -> Result<Option<CampgroundDetail>>;

    async fn insert(&self, campground: &Campground) -> Result<()>;

    /// Persists the scalar fields and the image of an existing campground.
    ///
    /// # Developer Note
    /// Must never write the like set: toggles from other requests may have
    /// landed since `campground` was read.
    async fn save(&self, campground: &Campground) -> Result<()>;

    /// Drops the image reference of a campground whose media is already gone.
    async fn clear_image(&self, id: CampgroundId) -> Result<()>;

    /// Flips `user`'s membership in the like set as one atomic update.
    async fn toggle_like(&self, id: CampgroundId, user: UserId) -> Result<LikeToggle>;

    /// Removes the campground's comments, reviews and the campground itself.
    /// Either everything is removed or nothing is.
    async fn delete_cascade(&self, campground: &Campground) -> Result<()>;

    async fn insert_comment(&self, comment: &Comment) -> Result<()>;

    async fn insert_review(&self, review: &Review) -> Result<()>;
}

/// Media hosting contract: upload returns a URL and a deletion handle.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, upload: MediaUpload) -> Result<Image>;

    /// Deleting a handle the store no longer knows is not an error.
    async fn delete(&self, handle: &MediaHandle) -> Result<()>;
}

/// Turns a bearer token into the identity it was issued for.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity>;
}
