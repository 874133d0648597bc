//! `DashMap`-backed implementation of `CampgroundRepository`.
//!
//! Used by the test suites and by the binary when no database is configured.
//! Like toggles run under the shard write lock of the campground's entry, so
//! concurrent toggles from different users cannot overwrite each other.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{
    Campground, CampgroundDetail, CampgroundId, CampgroundRepository, Comment, CommentId,
    DomainError, LikeToggle, Result, Review, ReviewId, UserId,
};

const ENTITY: &str = "Campground";

#[derive(Debug, Default)]
pub struct MemoryCampgroundRepository {
    campgrounds: DashMap<CampgroundId, Campground>,
    comments: DashMap<CommentId, Comment>,
    reviews: DashMap<ReviewId, Review>,
}

impl MemoryCampgroundRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }

    /// Whether any stored comment or review still points at `id`.
    pub fn has_dependents(&self, id: CampgroundId) -> bool {
        self.comments.iter().any(|comment| comment.campground_id == id)
            || self.reviews.iter().any(|review| review.campground_id == id)
    }
}

#[async_trait]
impl CampgroundRepository for MemoryCampgroundRepository {
    async fn list(&self) -> Result<Vec<Campground>> {
        let mut campgrounds: Vec<Campground> = self
            .campgrounds
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        campgrounds.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(campgrounds)
    }

    async fn find(&self, id: CampgroundId) -> Result<Option<Campground>> {
        Ok(self.campgrounds.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_detail(&self, id: CampgroundId) -> Result<Option<CampgroundDetail>> {
        let Some(campground) = self.find(id).await? else {
            return Ok(None);
        };

        let comments = campground
            .comments
            .iter()
            .filter_map(|comment_id| self.comments.get(comment_id).map(|c| c.value().clone()))
            .collect();
        let reviews = campground
            .reviews
            .iter()
            .filter_map(|review_id| self.reviews.get(review_id).map(|r| r.value().clone()))
            .collect();

        Ok(Some(CampgroundDetail::new(campground, comments, reviews)))
    }

    async fn insert(&self, campground: &Campground) -> Result<()> {
        match self.campgrounds.entry(campground.id) {
            Entry::Occupied(_) => Err(DomainError::Repository(format!(
                "duplicate campground id {}",
                campground.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(campground.clone());
                Ok(())
            }
        }
    }

    async fn save(&self, campground: &Campground) -> Result<()> {
        let mut stored = self
            .campgrounds
            .get_mut(&campground.id)
            .ok_or_else(|| DomainError::not_found(ENTITY, campground.id))?;

        stored.name.clone_from(&campground.name);
        stored.price.clone_from(&campground.price);
        stored.description.clone_from(&campground.description);
        stored.image.clone_from(&campground.image);
        Ok(())
    }

    async fn clear_image(&self, id: CampgroundId) -> Result<()> {
        let mut stored = self
            .campgrounds
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(ENTITY, id))?;
        stored.image = None;
        Ok(())
    }

    async fn toggle_like(&self, id: CampgroundId, user: UserId) -> Result<LikeToggle> {
        let mut stored = self
            .campgrounds
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(ENTITY, id))?;
        Ok(stored.toggle_like(user))
    }

    async fn delete_cascade(&self, campground: &Campground) -> Result<()> {
        // The stored lists win over the caller's copy: children added since
        // the caller read the record must go too. Nothing below can fail.
        let Some((_, stored)) = self.campgrounds.remove(&campground.id) else {
            return Err(DomainError::not_found(ENTITY, campground.id));
        };

        for comment_id in &stored.comments {
            self.comments.remove(comment_id);
        }
        for review_id in &stored.reviews {
            self.reviews.remove(review_id);
        }
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        let mut parent = self
            .campgrounds
            .get_mut(&comment.campground_id)
            .ok_or_else(|| DomainError::not_found(ENTITY, comment.campground_id))?;
        parent.comments.push(comment.id);
        self.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        let mut parent = self
            .campgrounds
            .get_mut(&review.campground_id)
            .ok_or_else(|| DomainError::not_found(ENTITY, review.campground_id))?;
        parent.reviews.push(review.id);
        self.reviews.insert(review.id, review.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{Author, CampgroundFields, Image, MediaHandle};
    use std::sync::Arc;

    fn author() -> Author {
        Author {
            id: UserId::generate(),
            username: "ranger".into(),
        }
    }

    fn campground() -> Campground {
        Campground::new(
            author(),
            CampgroundFields {
                name: "Granite Hill".into(),
                price: "9".into(),
                description: "rocky".into(),
            },
            None,
        )
    }

    #[tokio::test]
    async fn insert_then_find() {
        let repo = MemoryCampgroundRepository::new();
        let campground = campground();
        repo.insert(&campground).await.unwrap();

        let found = repo.find(campground.id).await.unwrap();
        assert_eq!(found, Some(campground));
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let repo = MemoryCampgroundRepository::new();
        let campground = campground();
        repo.insert(&campground).await.unwrap();

        let err = repo.insert(&campground).await.unwrap_err();
        assert!(matches!(err, DomainError::Repository(_)));
    }

    #[tokio::test]
    async fn save_does_not_overwrite_likes() {
        let repo = MemoryCampgroundRepository::new();
        let campground = campground();
        repo.insert(&campground).await.unwrap();

        // A stale copy read before someone liked the campground.
        let mut stale = campground.clone();
        let fan = UserId::generate();
        repo.toggle_like(campground.id, fan).await.unwrap();

        stale.name = "Renamed".into();
        stale.image = Some(Image {
            url: "memory://x".into(),
            handle: MediaHandle::new("x"),
        });
        repo.save(&stale).await.unwrap();

        let stored = repo.find(campground.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
        assert!(stored.image.is_some());
        assert!(stored.is_liked_by(fan), "save must leave the like set alone");
    }

    #[tokio::test]
    async fn concurrent_toggles_from_different_users_all_land() {
        let repo = Arc::new(MemoryCampgroundRepository::new());
        let campground = campground();
        repo.insert(&campground).await.unwrap();

        let id = campground.id;
        let users: Vec<UserId> = (0..32).map(|_| UserId::generate()).collect();
        let tasks: Vec<_> = users
            .iter()
            .map(|&user| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.toggle_like(id, user).await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), LikeToggle::Liked);
        }

        let stored = repo.find(id).await.unwrap().unwrap();
        assert_eq!(stored.likes.len(), users.len());
    }

    #[tokio::test]
    async fn delete_cascade_removes_children() {
        let repo = MemoryCampgroundRepository::new();
        let campground = campground();
        repo.insert(&campground).await.unwrap();
        repo.insert_comment(&Comment::new(campground.id, author(), "great"))
            .await
            .unwrap();
        repo.insert_review(&Review::new(campground.id, author(), 5, "loved it"))
            .await
            .unwrap();

        let stored = repo.find(campground.id).await.unwrap().unwrap();
        repo.delete_cascade(&stored).await.unwrap();

        assert!(repo.find(campground.id).await.unwrap().is_none());
        assert!(!repo.has_dependents(campground.id));
        assert_eq!(repo.comment_count(), 0);
        assert_eq!(repo.review_count(), 0);
    }

    #[tokio::test]
    async fn delete_cascade_of_missing_campground_touches_nothing() {
        let repo = MemoryCampgroundRepository::new();
        let kept = campground();
        repo.insert(&kept).await.unwrap();
        repo.insert_comment(&Comment::new(kept.id, author(), "hi"))
            .await
            .unwrap();

        let err = repo.delete_cascade(&campground()).await.unwrap_err();

        assert!(matches!(err, DomainError::NotFound { .. }));
        assert_eq!(repo.comment_count(), 1);
    }

    #[tokio::test]
    async fn comments_need_an_existing_campground() {
        let repo = MemoryCampgroundRepository::new();
        let orphan = Comment::new(CampgroundId::generate(), author(), "lost");

        assert!(repo.insert_comment(&orphan).await.is_err());
        assert_eq!(repo.comment_count(), 0);
    }
}
