//! Reviews and their like/dislike votes.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;

use super::common::{now_rfc3339, MediaType};

/// Reviews returned per page on a title's review list
pub const REVIEWS_PER_PAGE: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub tmdb_id: i64,
    pub media_type: String,
    pub rating: i64,
    pub review_text: String,
    pub has_spoilers: bool,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A review together with who liked and disliked it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    #[serde(flatten)]
    pub review: Review,
    pub likes: Vec<String>,
    pub dislikes: Vec<String>,
    pub like_count: usize,
    pub dislike_count: usize,
}

impl ReviewResponse {
    fn new(review: Review, likes: Vec<String>, dislikes: Vec<String>) -> Self {
        Self {
            like_count: likes.len(),
            dislike_count: dislikes.len(),
            review,
            likes,
            dislikes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub tmdb_id: i64,
    pub media_type: MediaType,
    pub rating: i64,
    pub review_text: String,
    pub has_spoilers: bool,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub rating: Option<i64>,
    pub review_text: Option<String>,
    pub has_spoilers: Option<bool>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub tmdb_id: Option<i64>,
    pub media_type: Option<String>,
    pub rating: Option<i64>,
    pub review_text: Option<String>,
    pub has_spoilers: Option<bool>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    pub rating: Option<i64>,
    pub review_text: Option<String>,
    pub has_spoilers: Option<bool>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub action: Option<String>,
}

/// One page of a title's public reviews
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub reviews: Vec<ReviewResponse>,
    pub page: i64,
    pub total_pages: i64,
    pub total_results: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Like,
    Dislike,
    /// Withdraw any vote
    None,
}

impl VoteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteAction::Like => "like",
            VoteAction::Dislike => "dislike",
            VoteAction::None => "none",
        }
    }
}

impl std::str::FromStr for VoteAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(VoteAction::Like),
            "dislike" => Ok(VoteAction::Dislike),
            "none" => Ok(VoteAction::None),
            _ => Err(format!("Unknown vote action: {}", s)),
        }
    }
}

impl Review {
    pub async fn create(
        db: &SqlitePool,
        user_id: &str,
        username: &str,
        new: &NewReview,
    ) -> Result<Review, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO reviews (
                id, user_id, username, tmdb_id, media_type, rating, review_text,
                has_spoilers, is_public, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(username)
        .bind(new.tmdb_id)
        .bind(new.media_type.as_str())
        .bind(new.rating)
        .bind(&new.review_text)
        .bind(new.has_spoilers)
        .bind(new.is_public)
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

        Self::get_by_id(db, &id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(db: &SqlitePool, id: &str) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM reviews WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Public reviews, newest first, optionally narrowed to a title
    pub async fn list_public(
        db: &SqlitePool,
        tmdb_id: Option<i64>,
        media_type: Option<MediaType>,
    ) -> Result<Vec<Review>, sqlx::Error> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM reviews WHERE is_public = 1");
        if let Some(tmdb_id) = tmdb_id {
            query.push(" AND tmdb_id = ").push_bind(tmdb_id);
        }
        if let Some(media_type) = media_type {
            query.push(" AND media_type = ").push_bind(media_type.as_str());
        }
        query.push(" ORDER BY created_at DESC");

        query.build_query_as().fetch_all(db).await
    }

    /// A page of a title's public reviews plus the total number of them
    pub async fn list_for_title(
        db: &SqlitePool,
        tmdb_id: i64,
        media_type: MediaType,
        page: i64,
    ) -> Result<(Vec<Review>, i64), sqlx::Error> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reviews WHERE tmdb_id = ? AND media_type = ? AND is_public = 1",
        )
        .bind(tmdb_id)
        .bind(media_type.as_str())
        .fetch_one(db)
        .await?;

        let offset = (page.max(1) - 1) * REVIEWS_PER_PAGE;
        let reviews = sqlx::query_as(
            r#"
            SELECT * FROM reviews
            WHERE tmdb_id = ? AND media_type = ? AND is_public = 1
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(tmdb_id)
        .bind(media_type.as_str())
        .bind(REVIEWS_PER_PAGE)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok((reviews, total))
    }

    /// Every review the user wrote, public or not
    pub async fn list_for_user(db: &SqlitePool, user_id: &str) -> Result<Vec<Review>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM reviews WHERE user_id = ? ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(db)
            .await
    }

    pub async fn update(
        db: &SqlitePool,
        id: &str,
        changes: &ReviewChanges,
    ) -> Result<Option<Review>, sqlx::Error> {
        let now = now_rfc3339();

        sqlx::query(
            r#"
            UPDATE reviews SET
                rating = COALESCE(?, rating),
                review_text = COALESCE(?, review_text),
                has_spoilers = COALESCE(?, has_spoilers),
                is_public = COALESCE(?, is_public),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(changes.rating)
        .bind(&changes.review_text)
        .bind(changes.has_spoilers)
        .bind(changes.is_public)
        .bind(&now)
        .bind(id)
        .execute(db)
        .await?;

        Self::get_by_id(db, id).await
    }

    pub async fn delete(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the voter's vote on a review. Any previous vote is removed first,
    /// so a voter is never in both sets.
    pub async fn vote(
        db: &SqlitePool,
        review_id: &str,
        user_id: &str,
        action: VoteAction,
    ) -> Result<(), sqlx::Error> {
        let mut tx = db.begin().await?;

        sqlx::query("DELETE FROM review_votes WHERE review_id = ? AND user_id = ?")
            .bind(review_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if action != VoteAction::None {
            sqlx::query(
                "INSERT INTO review_votes (review_id, user_id, vote, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(review_id)
            .bind(user_id)
            .bind(action.as_str())
            .bind(now_rfc3339())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Attach vote sets to one review
    pub async fn with_votes(self, db: &SqlitePool) -> Result<ReviewResponse, sqlx::Error> {
        let mut responses = Self::attach_votes(db, vec![self]).await?;
        responses.pop().ok_or(sqlx::Error::RowNotFound)
    }

    /// Attach vote sets to a batch of reviews with a single query
    pub async fn attach_votes(
        db: &SqlitePool,
        reviews: Vec<Review>,
    ) -> Result<Vec<ReviewResponse>, sqlx::Error> {
        if reviews.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, String, String)> = {
            let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT review_id, user_id, vote FROM review_votes WHERE review_id IN (",
            );
            let mut ids = query.separated(", ");
            for review in &reviews {
                ids.push_bind(review.id.clone());
            }
            query.push(") ORDER BY created_at");
            query.build_query_as().fetch_all(db).await?
        };

        let mut votes: HashMap<String, (Vec<String>, Vec<String>)> = HashMap::new();
        for (review_id, user_id, vote) in rows {
            let entry = votes.entry(review_id).or_default();
            match vote.as_str() {
                "like" => entry.0.push(user_id),
                _ => entry.1.push(user_id),
            }
        }

        Ok(reviews
            .into_iter()
            .map(|review| {
                let (likes, dislikes) = votes.remove(&review.id).unwrap_or_default();
                ReviewResponse::new(review, likes, dislikes)
            })
            .collect())
    }

    pub async fn count_all(db: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::User;

    fn new_review(tmdb_id: i64) -> NewReview {
        NewReview {
            tmdb_id,
            media_type: MediaType::Movie,
            rating: 8,
            review_text: "Holds up".to_string(),
            has_spoilers: false,
            is_public: true,
        }
    }

    async fn setup() -> (SqlitePool, User, Review) {
        let db = crate::db::init_in_memory().await.unwrap();
        let author = User::create(&db, "neo", "neo@example.com", "hash").await.unwrap();
        let review = Review::create(&db, &author.id, &author.username, &new_review(603))
            .await
            .unwrap();
        (db, author, review)
    }

    #[test]
    fn test_vote_action_parse() {
        assert_eq!("like".parse::<VoteAction>(), Ok(VoteAction::Like));
        assert_eq!("Dislike".parse::<VoteAction>(), Ok(VoteAction::Dislike));
        assert_eq!("none".parse::<VoteAction>(), Ok(VoteAction::None));
        assert!("love".parse::<VoteAction>().is_err());
    }

    #[tokio::test]
    async fn test_duplicate_review_rejected() {
        let (db, author, _) = setup().await;

        let err = Review::create(&db, &author.id, &author.username, &new_review(603))
            .await
            .unwrap_err();
        let is_unique = err
            .as_database_error()
            .map(|e| e.is_unique_violation())
            .unwrap_or(false);
        assert!(is_unique);

        // Same id as a series is a different title
        let mut tv = new_review(603);
        tv.media_type = MediaType::Tv;
        assert!(Review::create(&db, &author.id, &author.username, &tv).await.is_ok());
    }

    #[tokio::test]
    async fn test_like_then_dislike_moves_vote() {
        let (db, _, review) = setup().await;
        let voter = User::create(&db, "trinity", "trinity@example.com", "hash").await.unwrap();

        Review::vote(&db, &review.id, &voter.id, VoteAction::Like).await.unwrap();
        Review::vote(&db, &review.id, &voter.id, VoteAction::Like).await.unwrap();
        let liked = review.clone().with_votes(&db).await.unwrap();
        assert_eq!(liked.likes, vec![voter.id.clone()]);
        assert!(liked.dislikes.is_empty());

        Review::vote(&db, &review.id, &voter.id, VoteAction::Dislike).await.unwrap();
        let disliked = review.clone().with_votes(&db).await.unwrap();
        assert!(disliked.likes.is_empty());
        assert_eq!(disliked.dislikes, vec![voter.id.clone()]);
        assert_eq!(disliked.dislike_count, 1);

        Review::vote(&db, &review.id, &voter.id, VoteAction::None).await.unwrap();
        let cleared = review.with_votes(&db).await.unwrap();
        assert!(cleared.likes.is_empty());
        assert!(cleared.dislikes.is_empty());
    }

    #[tokio::test]
    async fn test_title_pagination_and_visibility() {
        let db = crate::db::init_in_memory().await.unwrap();
        for i in 0..12 {
            let user = User::create(&db, &format!("u{}", i), &format!("u{}@example.com", i), "hash")
                .await
                .unwrap();
            let mut review = new_review(27205);
            review.is_public = i != 0;
            Review::create(&db, &user.id, &user.username, &review).await.unwrap();
        }

        let (first, total) = Review::list_for_title(&db, 27205, MediaType::Movie, 1).await.unwrap();
        assert_eq!(total, 11);
        assert_eq!(first.len(), 10);
        assert!(first.iter().all(|r| r.is_public));

        let (second, _) = Review::list_for_title(&db, 27205, MediaType::Movie, 2).await.unwrap();
        assert_eq!(second.len(), 1);

        let all_public = Review::list_public(&db, Some(27205), Some(MediaType::Movie)).await.unwrap();
        assert_eq!(all_public.len(), 11);
    }

    #[tokio::test]
    async fn test_update_keeps_omitted_fields() {
        let (db, _, review) = setup().await;

        let updated = Review::update(
            &db,
            &review.id,
            &ReviewChanges {
                rating: Some(4),
                is_public: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.rating, 4);
        assert!(!updated.is_public);
        assert_eq!(updated.review_text, "Holds up");
        assert_eq!(updated.created_at, review.created_at);
    }

    #[tokio::test]
    async fn test_delete_removes_votes() {
        let (db, _, review) = setup().await;
        let voter = User::create(&db, "trinity", "trinity@example.com", "hash").await.unwrap();
        Review::vote(&db, &review.id, &voter.id, VoteAction::Like).await.unwrap();

        assert!(Review::delete(&db, &review.id).await.unwrap());
        assert!(!Review::delete(&db, &review.id).await.unwrap());

        let votes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM review_votes")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(votes, 0);
    }

    #[tokio::test]
    async fn test_account_deletion_cascades() {
        let (db, author, review) = setup().await;
        let voter = User::create(&db, "trinity", "trinity@example.com", "hash").await.unwrap();
        Review::vote(&db, &review.id, &voter.id, VoteAction::Like).await.unwrap();
        crate::db::Interaction::set_favorite(&db, &author.id, 603, MediaType::Movie, true)
            .await
            .unwrap();

        let removed = User::delete_cascade(&db, &author.id).await.unwrap();
        assert_eq!(removed.interactions, 1);
        assert_eq!(removed.reviews, 1);
        assert_eq!(removed.votes, 0);

        assert!(User::get_by_id(&db, &author.id).await.unwrap().is_none());
        assert_eq!(Review::count_all(&db).await.unwrap(), 0);
        assert_eq!(crate::db::Interaction::count_all(&db).await.unwrap(), 0);
        // The voter's account is untouched
        assert!(User::get_by_id(&db, &voter.id).await.unwrap().is_some());
    }
}
