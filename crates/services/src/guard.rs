//! Owner-only access checks.

use std::sync::Arc;

use domains::{Campground, CampgroundId, CampgroundRepository, DomainError, Identity, Result};
use tracing::warn;

/// Decides whether an identity may mutate a campground.
pub struct OwnershipGuard {
    repo: Arc<dyn CampgroundRepository>,
}

impl OwnershipGuard {
    pub fn new(repo: Arc<dyn CampgroundRepository>) -> Self {
        Self { repo }
    }

    /// Returns the campground when `identity` is its author.
    pub async fn authorize(&self, identity: &Identity, id: CampgroundId) -> Result<Campground> {
        let campground = self
            .repo
            .find(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Campground", id))?;

        if !campground.is_owned_by(identity.id) {
            warn!(campground = %id, user = %identity.id, "ownership check failed");
            return Err(DomainError::Forbidden);
        }

        Ok(campground)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{Author, CampgroundFields, MockCampgroundRepository, UserId};

    fn identity(name: &str) -> Identity {
        Identity {
            id: UserId::generate(),
            username: name.into(),
        }
    }

    fn guard_over(campground: Option<Campground>) -> OwnershipGuard {
        let mut repo = MockCampgroundRepository::new();
        repo.expect_find()
            .returning(move |_| Ok(campground.clone()));
        OwnershipGuard::new(Arc::new(repo))
    }

    fn owned_by(owner: &Identity) -> Campground {
        Campground::new(
            Author::from(owner),
            CampgroundFields {
                name: "Lakeside".into(),
                price: "12".into(),
                description: "windy".into(),
            },
            None,
        )
    }

    #[tokio::test]
    async fn owner_is_allowed() {
        let owner = identity("owner");
        let campground = owned_by(&owner);
        let id = campground.id;

        let allowed = guard_over(Some(campground)).authorize(&owner, id).await;

        assert_eq!(allowed.map(|c| c.id), Ok(id));
    }

    #[tokio::test]
    async fn stranger_is_forbidden() {
        let campground = owned_by(&identity("owner"));
        let id = campground.id;

        let denied = guard_over(Some(campground))
            .authorize(&identity("stranger"), id)
            .await;

        assert_eq!(denied.unwrap_err(), DomainError::Forbidden);
    }

    #[tokio::test]
    async fn missing_campground_is_not_found() {
        let denied = guard_over(None)
            .authorize(&identity("owner"), CampgroundId::generate())
            .await;

        assert!(matches!(denied, Err(DomainError::NotFound { .. })));
    }
}
