//! # Campground lifecycle
//!
//! Orchestrates create/update/delete/like over the repository and the media
//! store. None of these sequences is atomic across both backends; calls are
//! ordered so that a failure leaves at worst an image-less record, never a
//! record pointing at deleted media.

use std::sync::Arc;

use domains::{
    Author, Campground, CampgroundDetail, CampgroundFields, CampgroundId, CampgroundRepository,
    DomainError, Identity, MediaStore, MediaUpload, Result,
};
use tracing::{error, info, warn};

const ENTITY: &str = "Campground";

pub struct CampgroundService {
    repo: Arc<dyn CampgroundRepository>,
    media: Arc<dyn MediaStore>,
}

impl CampgroundService {
    pub fn new(repo: Arc<dyn CampgroundRepository>, media: Arc<dyn MediaStore>) -> Self {
        Self { repo, media }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Campground>> {
        self.repo.list().await
    }

    /// Creates a campground owned by `identity`.
    ///
    /// # Developer Note
    /// If the insert fails after a successful upload the uploaded object is
    /// left behind. We log its handle instead of compensating.
    #[tracing::instrument(skip(self, identity, input, image), fields(user = %identity.id))]
    pub async fn create(
        &self,
        identity: &Identity,
        input: CampgroundFields,
        image: Option<MediaUpload>,
    ) -> Result<Campground> {
        // 1. Media: upload first so a failure creates nothing
        let image = match image {
            Some(upload) => Some(self.media.upload(upload).await?),
            None => None,
        };

        // 2. Build the aggregate
        let campground = Campground::new(Author::from(identity), input, image);

        // 3. Persistence
        if let Err(err) = self.repo.insert(&campground).await {
            if let Some(handle) = campground.image_handle() {
                warn!(%handle, error = %err, "campground not persisted, uploaded image orphaned");
            }
            return Err(err);
        }

        info!(campground = %campground.id, "campground created");
        Ok(campground)
    }

    /// Fetches a campground with comments and reviews for display.
    #[tracing::instrument(skip(self))]
    pub async fn show(&self, id: CampgroundId) -> Result<CampgroundDetail> {
        self.repo
            .find_detail(id)
            .await?
            .ok_or_else(|| DomainError::not_found(ENTITY, id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn find(&self, id: CampgroundId) -> Result<Campground> {
        self.repo
            .find(id)
            .await?
            .ok_or_else(|| DomainError::not_found(ENTITY, id))
    }

    /// Applies an owner's edit. Ownership is checked by the caller.
    #[tracing::instrument(skip(self, identity, input, image), fields(user = %identity.id))]
    pub async fn update(
        &self,
        identity: &Identity,
        id: CampgroundId,
        input: CampgroundFields,
        image: Option<MediaUpload>,
    ) -> Result<Campground> {
        let mut campground = self.find(id).await?;

        let replaced = match image {
            Some(upload) => {
                self.replace_image(&mut campground, upload).await?;
                true
            }
            None => false,
        };

        campground.apply(input);
        if let Err(err) = self.repo.save(&campground).await {
            if replaced {
                self.discard_replacement(&campground).await;
            }
            return Err(err);
        }

        info!(campground = %id, "campground updated");
        Ok(campground)
    }

    /// Deletes the old media object, then uploads the replacement.
    async fn replace_image(&self, campground: &mut Campground, upload: MediaUpload) -> Result<()> {
        if let Some(handle) = campground.image_handle() {
            // A failure here aborts the update with record and media untouched.
            self.media.delete(handle).await?;
        }
        let had_image = campground.image.take().is_some();

        match self.media.upload(upload).await {
            Ok(image) => {
                campground.image = Some(image);
                Ok(())
            }
            Err(err) => {
                // The old handle is dead; the record must not keep it.
                if had_image {
                    if let Err(clear_err) = self.repo.clear_image(campground.id).await {
                        error!(campground = %campground.id, error = %clear_err, "could not clear stale image reference");
                    }
                }
                Err(err)
            }
        }
    }

    /// Undoes a replacement whose record never got saved. The stored record
    /// still names the deleted old image, and nothing names the new one.
    async fn discard_replacement(&self, campground: &Campground) {
        if let Err(err) = self.repo.clear_image(campground.id).await {
            error!(campground = %campground.id, error = %err, "could not clear stale image reference");
        }
        if let Some(handle) = campground.image_handle() {
            if let Err(err) = self.media.delete(handle).await {
                warn!(%handle, error = %err, "campground not saved, uploaded image orphaned");
            }
        }
    }

    /// Removes a campground, its media, comments and reviews.
    /// Ownership is checked by the caller.
    #[tracing::instrument(skip(self, identity), fields(user = %identity.id))]
    pub async fn delete(&self, identity: &Identity, id: CampgroundId) -> Result<()> {
        let campground = self.find(id).await?;

        // 1. Media first; failure leaves everything in place
        if let Some(handle) = campground.image_handle() {
            self.media.delete(handle).await?;
        }

        // 2. Comments, reviews and the record, all or nothing
        if let Err(err) = self.repo.delete_cascade(&campground).await {
            error!(campground = %id, error = %err, "cascade delete failed after media removal");
            if campground.image.is_some() {
                if let Err(clear_err) = self.repo.clear_image(id).await {
                    error!(campground = %id, error = %clear_err, "could not clear stale image reference");
                }
            }
            return Err(err);
        }

        info!(
            campground = %id,
            comments = campground.comments.len(),
            reviews = campground.reviews.len(),
            "campground deleted"
        );
        Ok(())
    }

    /// Likes or unlikes a campground on behalf of `identity`.
    #[tracing::instrument(skip(self, identity), fields(user = %identity.id))]
    pub async fn toggle_like(&self, identity: &Identity, id: CampgroundId) -> Result<Campground> {
        let mut campground = self.find(id).await?;

        let toggle = self.repo.toggle_like(id, identity.id).await?;
        campground.record_like(identity.id, toggle);

        Ok(campground)
    }
}
