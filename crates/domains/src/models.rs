//! # Domain Models
//!
//! These structs represent the core entities of YelpCamp.
//! The [`Campground`] is the aggregate root; comments and reviews hang off it
//! by id and are removed together with it.

use std::collections::BTreeSet;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};

use crate::ids::{CampgroundId, CommentId, MediaHandle, ReviewId, UserId};

/// The authenticated user acting on a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
}

/// Owning identity of a record, frozen at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub username: String,
}

impl From<&Identity> for Author {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username.clone(),
        }
    }
}

/// A hosted image: the public URL plus the handle needed to delete it.
///
/// Both halves travel together so a record can never point at a handle
/// without an image or the other way around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub handle: MediaHandle,
}

/// The user-editable scalar fields of a campground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampgroundFields {
    pub name: String,
    pub price: String,
    pub description: String,
}

/// A campground listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campground {
    pub id: CampgroundId,
    pub name: String,
    /// Free-form, shown as entered (e.g. "20")
    pub price: String,
    pub description: String,
    pub image: Option<Image>,
    pub author: Author,
    /// Owned for cascade-delete purposes, not for display ordering
    pub comments: Vec<CommentId>,
    pub reviews: Vec<ReviewId>,
    pub likes: BTreeSet<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Result of flipping one identity's membership in a like set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Liked,
    Unliked,
}

impl Campground {
    pub fn new(author: Author, fields: CampgroundFields, image: Option<Image>) -> Self {
        Self {
            id: CampgroundId::generate(),
            name: fields.name,
            price: fields.price,
            description: fields.description,
            image,
            author,
            comments: Vec::new(),
            reviews: Vec::new(),
            likes: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Overwrites the editable fields. Identity, author and likes are untouched.
    pub fn apply(&mut self, fields: CampgroundFields) {
        self.name = fields.name;
        self.price = fields.price;
        self.description = fields.description;
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.author.id == user
    }

    pub fn is_liked_by(&self, user: UserId) -> bool {
        self.likes.contains(&user)
    }

    /// Set-XOR of `user` in the like set.
    pub fn toggle_like(&mut self, user: UserId) -> LikeToggle {
        if self.likes.remove(&user) {
            LikeToggle::Unliked
        } else {
            self.likes.insert(user);
            LikeToggle::Liked
        }
    }

    /// Brings the local like set in line with a toggle applied elsewhere.
    pub fn record_like(&mut self, user: UserId, toggle: LikeToggle) {
        match toggle {
            LikeToggle::Liked => self.likes.insert(user),
            LikeToggle::Unliked => self.likes.remove(&user),
        };
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image.as_ref().map(|image| image.url.as_str())
    }

    pub fn image_handle(&self) -> Option<&MediaHandle> {
        self.image.as_ref().map(|image| &image.handle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub campground_id: CampgroundId,
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(campground_id: CampgroundId, author: Author, text: impl Into<String>) -> Self {
        Self {
            id: CommentId::generate(),
            campground_id,
            author,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub campground_id: CampgroundId,
    pub author: Author,
    /// 1..=5
    pub rating: u8,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        campground_id: CampgroundId,
        author: Author,
        rating: u8,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: ReviewId::generate(),
            campground_id,
            author,
            rating: rating.clamp(1, 5),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// A campground with its child collections expanded for the detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampgroundDetail {
    pub campground: Campground,
    /// No ordering guarantee
    pub comments: Vec<Comment>,
    /// Newest first
    pub reviews: Vec<Review>,
}

impl CampgroundDetail {
    /// Assembles a detail view, putting reviews newest first.
    pub fn new(campground: Campground, comments: Vec<Comment>, mut reviews: Vec<Review>) -> Self {
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            campground,
            comments,
            reviews,
        }
    }

    pub fn average_rating(&self) -> Option<f32> {
        if self.reviews.is_empty() {
            return None;
        }
        let total: u32 = self.reviews.iter().map(|review| u32::from(review.rating)).sum();
        Some(total as f32 / self.reviews.len() as f32)
    }
}

/// A validated image file on its way to the media store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: Mime,
    pub bytes: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn author() -> Author {
        Author {
            id: UserId::generate(),
            username: "ranger".into(),
        }
    }

    fn fields() -> CampgroundFields {
        CampgroundFields {
            name: "Pine Ridge".into(),
            price: "20".into(),
            description: "quiet".into(),
        }
    }

    #[test]
    fn new_campground_starts_without_likes_or_children() {
        let owner = author();
        let campground = Campground::new(owner.clone(), fields(), None);
        assert_eq!(campground.author, owner);
        assert!(campground.likes.is_empty());
        assert!(campground.comments.is_empty());
        assert!(campground.reviews.is_empty());
        assert!(campground.image_url().is_none());
    }

    #[test]
    fn toggle_like_is_involutive() {
        let mut campground = Campground::new(author(), fields(), None);
        let user = UserId::generate();

        assert_eq!(campground.toggle_like(user), LikeToggle::Liked);
        assert!(campground.is_liked_by(user));
        assert_eq!(campground.toggle_like(user), LikeToggle::Unliked);
        assert!(!campground.is_liked_by(user));
    }

    #[test]
    fn toggle_like_commutes_across_users() {
        let (a, b) = (UserId::generate(), UserId::generate());
        let mut left = Campground::new(author(), fields(), None);
        let mut right = left.clone();

        left.toggle_like(a);
        left.toggle_like(b);
        right.toggle_like(b);
        right.toggle_like(a);

        assert_eq!(left.likes, right.likes);
        assert_eq!(left.likes.len(), 2);
    }

    #[test]
    fn apply_keeps_owner_and_likes() {
        let owner = author();
        let mut campground = Campground::new(owner.clone(), fields(), None);
        let fan = UserId::generate();
        campground.toggle_like(fan);

        campground.apply(CampgroundFields {
            name: "Cedar Flats".into(),
            price: "35".into(),
            description: "river access".into(),
        });

        assert_eq!(campground.name, "Cedar Flats");
        assert_eq!(campground.author, owner);
        assert!(campground.is_liked_by(fan));
    }

    #[test]
    fn detail_orders_reviews_newest_first() {
        let campground = Campground::new(author(), fields(), None);
        let mut older = Review::new(campground.id, author(), 4, "nice");
        older.created_at = Utc::now() - Duration::days(2);
        let newer = Review::new(campground.id, author(), 2, "muddy");

        let detail = CampgroundDetail::new(campground, Vec::new(), vec![older.clone(), newer.clone()]);

        assert_eq!(detail.reviews, vec![newer, older]);
        assert_eq!(detail.average_rating(), Some(3.0));
    }

    #[test]
    fn review_rating_is_clamped() {
        let review = Review::new(CampgroundId::generate(), author(), 9, "!!!");
        assert_eq!(review.rating, 5);
    }
}
