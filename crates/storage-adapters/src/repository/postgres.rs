//! # PostgreSQL Implementation
//!
//! Maps between the relational schema in `migrations/` and the domain models.
//! Likes are rows of `campground_likes`, so a toggle touches exactly one
//! `(campground, user)` pair and never rewrites anybody else's like.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Author, Campground, CampgroundDetail, CampgroundId, CampgroundRepository, Comment, CommentId,
    DomainError, Image, LikeToggle, MediaHandle, Result, Review, ReviewId, UserId,
};
use sqlx::migrate::MigrateError;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

const ENTITY: &str = "Campground";

const SELECT_CAMPGROUNDS: &str = r#"
    SELECT
      c.id, c.name, c.price, c.description, c.image_url, c.image_handle,
      c.author_id, c.author_username, c.created_at,
      ARRAY(SELECT l.user_id FROM campground_likes l WHERE l.campground_id = c.id) AS likes,
      ARRAY(SELECT m.id FROM comments m WHERE m.campground_id = c.id ORDER BY m.created_at) AS comment_ids,
      ARRAY(SELECT r.id FROM reviews r WHERE r.campground_id = c.id ORDER BY r.created_at) AS review_ids
    FROM campgrounds c
"#;

// A single statement: either the pair existed and is deleted, or it did not
// and is inserted. RETURNING yields a row only for the insert.
const TOGGLE_LIKE: &str = r#"
    WITH removed AS (
      DELETE FROM campground_likes
      WHERE campground_id = $1 AND user_id = $2
      RETURNING user_id
    )
    INSERT INTO campground_likes (campground_id, user_id)
    SELECT $1, $2
    WHERE NOT EXISTS (SELECT 1 FROM removed)
    ON CONFLICT DO NOTHING
    RETURNING user_id
"#;

pub struct PgCampgroundRepository {
    pool: PgPool,
}

impl PgCampgroundRepository {
    pub async fn connect(url: &str, max_connections: u32) -> std::result::Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> std::result::Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn repository_error(err: sqlx::Error) -> DomainError {
    DomainError::Repository(err.to_string())
}

fn campground_from_row(row: &PgRow) -> std::result::Result<Campground, sqlx::Error> {
    let image_url: Option<String> = row.try_get("image_url")?;
    let image_handle: Option<String> = row.try_get("image_handle")?;
    let image = match (image_url, image_handle) {
        (Some(url), Some(handle)) => Some(Image {
            url,
            handle: MediaHandle::new(handle),
        }),
        _ => None,
    };

    Ok(Campground {
        id: CampgroundId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        description: row.try_get("description")?,
        image,
        author: Author {
            id: UserId::from_uuid(row.try_get("author_id")?),
            username: row.try_get("author_username")?,
        },
        comments: row
            .try_get::<Vec<Uuid>, _>("comment_ids")?
            .into_iter()
            .map(CommentId::from_uuid)
            .collect(),
        reviews: row
            .try_get::<Vec<Uuid>, _>("review_ids")?
            .into_iter()
            .map(ReviewId::from_uuid)
            .collect(),
        likes: row
            .try_get::<Vec<Uuid>, _>("likes")?
            .into_iter()
            .map(UserId::from_uuid)
            .collect::<BTreeSet<_>>(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn author_from_row(row: &PgRow) -> std::result::Result<Author, sqlx::Error> {
    Ok(Author {
        id: UserId::from_uuid(row.try_get("author_id")?),
        username: row.try_get("author_username")?,
    })
}

fn comment_from_row(row: &PgRow) -> std::result::Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: CommentId::from_uuid(row.try_get("id")?),
        campground_id: CampgroundId::from_uuid(row.try_get("campground_id")?),
        author: author_from_row(row)?,
        text: row.try_get("body")?,
        created_at: row.try_get("created_at")?,
    })
}

fn review_from_row(row: &PgRow) -> std::result::Result<Review, sqlx::Error> {
    let rating: i16 = row.try_get("rating")?;
    Ok(Review {
        id: ReviewId::from_uuid(row.try_get("id")?),
        campground_id: CampgroundId::from_uuid(row.try_get("campground_id")?),
        author: author_from_row(row)?,
        rating: u8::try_from(rating).map_err(|err| sqlx::Error::Decode(Box::new(err)))?,
        text: row.try_get("body")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CampgroundRepository for PgCampgroundRepository {
    async fn list(&self) -> Result<Vec<Campground>> {
        let query = format!("{SELECT_CAMPGROUNDS} ORDER BY c.created_at, c.id");
        sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(repository_error)?
            .iter()
            .map(campground_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(repository_error)
    }

    async fn find(&self, id: CampgroundId) -> Result<Option<Campground>> {
        let query = format!("{SELECT_CAMPGROUNDS} WHERE c.id = $1");
        let row = sqlx::query(&query)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;

        row.as_ref()
            .map(campground_from_row)
            .transpose()
            .map_err(repository_error)
    }

    async fn find_detail(&self, id: CampgroundId) -> Result<Option<CampgroundDetail>> {
        let Some(campground) = self.find(id).await? else {
            return Ok(None);
        };

        let comments = sqlx::query(
            "SELECT id, campground_id, author_id, author_username, body, created_at FROM comments WHERE campground_id = $1 ORDER BY created_at",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(repository_error)?
        .iter()
        .map(comment_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(repository_error)?;

        let reviews = sqlx::query(
            "SELECT id, campground_id, author_id, author_username, rating, body, created_at FROM reviews WHERE campground_id = $1 ORDER BY created_at DESC",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(repository_error)?
        .iter()
        .map(review_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(repository_error)?;

        Ok(Some(CampgroundDetail::new(campground, comments, reviews)))
    }

    async fn insert(&self, campground: &Campground) -> Result<()> {
        sqlx::query(
            "INSERT INTO campgrounds (id, name, price, description, image_url, image_handle, author_id, author_username, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(campground.id.as_uuid())
        .bind(&campground.name)
        .bind(&campground.price)
        .bind(&campground.description)
        .bind(campground.image_url())
        .bind(campground.image_handle().map(MediaHandle::as_str))
        .bind(campground.author.id.as_uuid())
        .bind(&campground.author.username)
        .bind(campground.created_at)
        .execute(&self.pool)
        .await
        .map_err(repository_error)?;
        Ok(())
    }

    async fn save(&self, campground: &Campground) -> Result<()> {
        let result = sqlx::query(
            "UPDATE campgrounds SET name = $2, price = $3, description = $4, image_url = $5, image_handle = $6 WHERE id = $1",
        )
        .bind(campground.id.as_uuid())
        .bind(&campground.name)
        .bind(&campground.price)
        .bind(&campground.description)
        .bind(campground.image_url())
        .bind(campground.image_handle().map(MediaHandle::as_str))
        .execute(&self.pool)
        .await
        .map_err(repository_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(ENTITY, campground.id));
        }
        Ok(())
    }

    async fn clear_image(&self, id: CampgroundId) -> Result<()> {
        sqlx::query("UPDATE campgrounds SET image_url = NULL, image_handle = NULL WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(repository_error)?;
        Ok(())
    }

    async fn toggle_like(&self, id: CampgroundId, user: UserId) -> Result<LikeToggle> {
        let inserted = sqlx::query(TOGGLE_LIKE)
            .bind(id.as_uuid())
            .bind(user.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(repository_error)?;

        Ok(if inserted.is_some() {
            LikeToggle::Liked
        } else {
            LikeToggle::Unliked
        })
    }

    /// Removes children and the campground in one transaction.
    ///
    /// # Developer Note
    /// Children are matched by foreign key rather than by the caller's id
    /// lists, so a comment added after the caller's read cannot be orphaned
    /// (it would also make the final DELETE fail on the FK and roll back).
    async fn delete_cascade(&self, campground: &Campground) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(repository_error)?;

        let comments = sqlx::query("DELETE FROM comments WHERE campground_id = $1")
            .bind(campground.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(repository_error)?;

        let reviews = sqlx::query("DELETE FROM reviews WHERE campground_id = $1")
            .bind(campground.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(repository_error)?;

        let removed = sqlx::query("DELETE FROM campgrounds WHERE id = $1")
            .bind(campground.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(repository_error)?;

        if removed.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(DomainError::not_found(ENTITY, campground.id));
        }

        tx.commit().await.map_err(repository_error)?;

        debug!(
            campground = %campground.id,
            comments = comments.rows_affected(),
            reviews = reviews.rows_affected(),
            "cascade committed"
        );
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<()> {
        sqlx::query(
            "INSERT INTO comments (id, campground_id, author_id, author_username, body, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(comment.id.as_uuid())
        .bind(comment.campground_id.as_uuid())
        .bind(comment.author.id.as_uuid())
        .bind(&comment.author.username)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(repository_error)?;
        Ok(())
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        sqlx::query(
            "INSERT INTO reviews (id, campground_id, author_id, author_username, rating, body, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(review.id.as_uuid())
        .bind(review.campground_id.as_uuid())
        .bind(review.author.id.as_uuid())
        .bind(&review.author.username)
        .bind(i16::from(review.rating))
        .bind(&review.text)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(repository_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use domains::CampgroundFields;

    fn campground() -> Campground {
        Campground::new(
            Author {
                id: UserId::generate(),
                username: "ranger".into(),
            },
            CampgroundFields {
                name: "Aspen Loop".into(),
                price: "15".into(),
                description: "shady".into(),
            },
            Some(Image {
                url: "https://media.test/a.jpg".into(),
                handle: MediaHandle::new("a"),
            }),
        )
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn toggle_like_round_trip(pool: PgPool) {
        let repo = PgCampgroundRepository::from_pool(pool);
        let campground = campground();
        repo.insert(&campground).await.unwrap();
        let fan = UserId::generate();

        assert_eq!(repo.toggle_like(campground.id, fan).await.unwrap(), LikeToggle::Liked);
        assert_eq!(repo.toggle_like(campground.id, fan).await.unwrap(), LikeToggle::Unliked);

        let stored = repo.find(campground.id).await.unwrap().expect("stored");
        assert!(stored.likes.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn concurrent_likes_from_different_users_all_land(pool: PgPool) {
        const FANS: usize = 16;
        let repo = Arc::new(PgCampgroundRepository::from_pool(pool));
        let campground = campground();
        repo.insert(&campground).await.unwrap();
        let id = campground.id;

        let tasks: Vec<_> = (0..FANS)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.toggle_like(id, UserId::generate()).await })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), LikeToggle::Liked);
        }

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM campground_likes WHERE campground_id = $1")
            .bind(id.as_uuid())
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(rows, FANS as i64);
        let stored = repo.find(id).await.unwrap().expect("stored");
        assert_eq!(stored.likes.len(), FANS);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn delete_cascade_removes_children(pool: PgPool) {
        let repo = PgCampgroundRepository::from_pool(pool);
        let campground = campground();
        repo.insert(&campground).await.unwrap();
        let author = campground.author.clone();
        repo.insert_comment(&Comment::new(campground.id, author.clone(), "nice"))
            .await
            .unwrap();
        repo.insert_review(&Review::new(campground.id, author, 4, "good"))
            .await
            .unwrap();

        let stored = repo.find(campground.id).await.unwrap().expect("stored");
        assert_eq!(stored.comments.len(), 1);
        repo.delete_cascade(&stored).await.unwrap();

        assert!(repo.find(campground.id).await.unwrap().is_none());
        let leftovers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE campground_id = $1")
            .bind(campground.id.as_uuid())
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(leftovers, 0);
    }
}
