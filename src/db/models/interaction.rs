//! Per-user tracking records for titles.
//!
//! There is at most one interaction per (user, catalog id). Every write that
//! may create a record goes through `INSERT .. ON CONFLICT(user_id, tmdb_id)`
//! so concurrent requests for the same title converge on a single row.

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use super::common::{now_rfc3339, MediaType, WatchStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,
    pub user_id: String,
    pub tmdb_id: i64,
    pub media_type: String,
    pub status: Option<String>,
    pub personal_rating: Option<i64>,
    pub is_favorite: bool,
    pub seasons_watched: i64,
    pub episodes_watched: i64,
    pub date_added: String,
    pub date_watched: Option<String>,
    pub last_updated: String,
}

/// Validated field values for a create or update. `None` leaves the stored
/// value alone (or uses the column default on creation). For the nullable
/// columns `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionChanges {
    pub status: Option<Option<WatchStatus>>,
    pub personal_rating: Option<Option<i64>>,
    pub is_favorite: Option<bool>,
    pub seasons_watched: Option<i64>,
    pub episodes_watched: Option<i64>,
    pub date_watched: Option<Option<String>>,
}

/// Raw interaction fields as they arrive in a request body. An explicit
/// `null` on a nullable field deserializes to `Some(None)`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionFields {
    #[serde(default, deserialize_with = "present")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub personal_rating: Option<Option<i64>>,
    pub is_favorite: Option<bool>,
    pub seasons_watched: Option<i64>,
    pub episodes_watched: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub date_watched: Option<Option<String>>,
}

/// Wrap whatever was sent, `null` included, so a missing key stays `None`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertInteractionRequest {
    pub tmdb_id: Option<i64>,
    pub media_type: Option<String>,
    #[serde(flatten)]
    pub fields: InteractionFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFavoriteRequest {
    pub tmdb_id: Option<i64>,
    pub media_type: Option<String>,
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToWatchlistRequest {
    pub tmdb_id: Option<i64>,
    pub media_type: Option<String>,
    pub status: Option<String>,
}

/// The favorite-relevant slice of an interaction
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteSummary {
    pub id: String,
    pub user_id: String,
    pub tmdb_id: i64,
    pub media_type: String,
    pub is_favorite: bool,
    pub status: Option<String>,
    pub personal_rating: Option<i64>,
    pub last_updated: String,
}

impl From<Interaction> for FavoriteSummary {
    fn from(interaction: Interaction) -> Self {
        Self {
            id: interaction.id,
            user_id: interaction.user_id,
            tmdb_id: interaction.tmdb_id,
            media_type: interaction.media_type,
            is_favorite: interaction.is_favorite,
            status: interaction.status,
            personal_rating: interaction.personal_rating,
            last_updated: interaction.last_updated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SetFavoriteResponse {
    pub success: bool,
    pub message: String,
    pub interaction: FavoriteSummary,
}

/// Optional filters for listing a user's interactions
#[derive(Debug, Clone, Default)]
pub struct InteractionFilter {
    pub tmdb_id: Option<i64>,
    pub media_type: Option<MediaType>,
    pub status: Option<WatchStatus>,
    pub favorite: Option<bool>,
}

/// Mean personal rating for a title across all users
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub avg_rating: f64,
    pub count: i64,
}

/// Per-status counts for a user's list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchStats {
    pub watched: i64,
    pub watching: i64,
    pub want_to_watch: i64,
    pub dropped: i64,
    pub favorites: i64,
    /// watched + watching + want_to_watch
    pub total: i64,
}

impl Interaction {
    pub fn watch_status(&self) -> Option<WatchStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    /// Create the interaction for (user, title) or merge `changes` into the
    /// existing one. The media type is only written on creation.
    pub async fn upsert(
        db: &SqlitePool,
        user_id: &str,
        tmdb_id: i64,
        media_type: MediaType,
        changes: &InteractionChanges,
    ) -> Result<Interaction, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_rfc3339();
        let status = changes.status.flatten().map(|s| s.as_str());

        sqlx::query(
            r#"
            INSERT INTO interactions (
                id, user_id, tmdb_id, media_type, status, personal_rating, is_favorite,
                seasons_watched, episodes_watched, date_added, date_watched, last_updated
            )
            VALUES (?, ?, ?, ?, ?, ?, COALESCE(?, 0), COALESCE(?, 0), COALESCE(?, 0), ?, ?, ?)
            ON CONFLICT(user_id, tmdb_id) DO UPDATE SET
                status = CASE WHEN ? THEN excluded.status ELSE interactions.status END,
                personal_rating = CASE WHEN ? THEN excluded.personal_rating ELSE interactions.personal_rating END,
                is_favorite = COALESCE(?, interactions.is_favorite),
                seasons_watched = COALESCE(?, interactions.seasons_watched),
                episodes_watched = COALESCE(?, interactions.episodes_watched),
                date_watched = CASE WHEN ? THEN excluded.date_watched ELSE interactions.date_watched END,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(tmdb_id)
        .bind(media_type.as_str())
        .bind(status)
        .bind(changes.personal_rating.flatten())
        .bind(changes.is_favorite)
        .bind(changes.seasons_watched)
        .bind(changes.episodes_watched)
        .bind(&now)
        .bind(changes.date_watched.clone().flatten())
        .bind(&now)
        .bind(changes.status.is_some())
        .bind(changes.personal_rating.is_some())
        .bind(changes.is_favorite)
        .bind(changes.seasons_watched)
        .bind(changes.episodes_watched)
        .bind(changes.date_watched.is_some())
        .execute(db)
        .await?;

        Self::get_for_title(db, user_id, tmdb_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Set only the favorite flag, creating a bare record when the user has
    /// never touched the title.
    pub async fn set_favorite(
        db: &SqlitePool,
        user_id: &str,
        tmdb_id: i64,
        media_type: MediaType,
        is_favorite: bool,
    ) -> Result<Interaction, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO interactions (id, user_id, tmdb_id, media_type, is_favorite, date_added, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, tmdb_id) DO UPDATE SET
                is_favorite = excluded.is_favorite,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(tmdb_id)
        .bind(media_type.as_str())
        .bind(is_favorite)
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

        Self::get_for_title(db, user_id, tmdb_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(db: &SqlitePool, id: &str) -> Result<Option<Interaction>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM interactions WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn get_for_title(
        db: &SqlitePool,
        user_id: &str,
        tmdb_id: i64,
    ) -> Result<Option<Interaction>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM interactions WHERE user_id = ? AND tmdb_id = ?")
            .bind(user_id)
            .bind(tmdb_id)
            .fetch_optional(db)
            .await
    }

    /// List a user's interactions, most recently touched first
    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: &str,
        filter: &InteractionFilter,
    ) -> Result<Vec<Interaction>, sqlx::Error> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM interactions WHERE user_id = ");
        query.push_bind(user_id);

        if let Some(tmdb_id) = filter.tmdb_id {
            query.push(" AND tmdb_id = ").push_bind(tmdb_id);
        }
        if let Some(media_type) = filter.media_type {
            query.push(" AND media_type = ").push_bind(media_type.as_str());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(favorite) = filter.favorite {
            query.push(" AND is_favorite = ").push_bind(favorite);
        }
        query.push(" ORDER BY last_updated DESC");

        query.build_query_as().fetch_all(db).await
    }

    /// Merge `changes` into an interaction the user owns. Returns `None` when
    /// the id does not exist or belongs to someone else.
    pub async fn update_owned(
        db: &SqlitePool,
        user_id: &str,
        id: &str,
        changes: &InteractionChanges,
    ) -> Result<Option<Interaction>, sqlx::Error> {
        let now = now_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE interactions SET
                status = CASE WHEN ? THEN ? ELSE status END,
                personal_rating = CASE WHEN ? THEN ? ELSE personal_rating END,
                is_favorite = COALESCE(?, is_favorite),
                seasons_watched = COALESCE(?, seasons_watched),
                episodes_watched = COALESCE(?, episodes_watched),
                date_watched = CASE WHEN ? THEN ? ELSE date_watched END,
                last_updated = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(changes.status.is_some())
        .bind(changes.status.flatten().map(|s| s.as_str()))
        .bind(changes.personal_rating.is_some())
        .bind(changes.personal_rating.flatten())
        .bind(changes.is_favorite)
        .bind(changes.seasons_watched)
        .bind(changes.episodes_watched)
        .bind(changes.date_watched.is_some())
        .bind(changes.date_watched.clone().flatten())
        .bind(&now)
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::get_by_id(db, id).await
    }

    pub async fn delete_for_title(
        db: &SqlitePool,
        user_id: &str,
        tmdb_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM interactions WHERE user_id = ? AND tmdb_id = ?")
            .bind(user_id)
            .bind(tmdb_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_owned(db: &SqlitePool, user_id: &str, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM interactions WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mean of all non-null personal ratings for a title
    pub async fn average_rating(
        db: &SqlitePool,
        tmdb_id: i64,
        media_type: MediaType,
    ) -> Result<RatingSummary, sqlx::Error> {
        let (count, avg): (i64, Option<f64>) = sqlx::query_as(
            r#"
            SELECT COUNT(personal_rating), AVG(personal_rating)
            FROM interactions
            WHERE tmdb_id = ? AND media_type = ? AND personal_rating IS NOT NULL
            "#,
        )
        .bind(tmdb_id)
        .bind(media_type.as_str())
        .fetch_one(db)
        .await?;

        if count == 0 {
            return Ok(RatingSummary {
                avg_rating: 0.0,
                count: 0,
            });
        }

        Ok(RatingSummary {
            avg_rating: avg.unwrap_or(0.0),
            count,
        })
    }

    pub async fn stats_for_user(db: &SqlitePool, user_id: &str) -> Result<WatchStats, sqlx::Error> {
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM interactions WHERE user_id = ? AND status IS NOT NULL GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        let favorites: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM interactions WHERE user_id = ? AND is_favorite = 1",
        )
        .bind(user_id)
        .fetch_one(db)
        .await?;

        let mut stats = WatchStats {
            favorites,
            ..Default::default()
        };
        for (status, count) in rows {
            match status.as_deref().and_then(|s| s.parse::<WatchStatus>().ok()) {
                Some(WatchStatus::Watched) => stats.watched = count,
                Some(WatchStatus::Watching) => stats.watching = count,
                Some(WatchStatus::WantToWatch) => stats.want_to_watch = count,
                Some(WatchStatus::Dropped) => stats.dropped = count,
                None => {}
            }
        }
        stats.total = stats.watched + stats.watching + stats.want_to_watch;

        Ok(stats)
    }

    pub async fn count_all(db: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM interactions")
            .fetch_one(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::User;

    async fn setup() -> (SqlitePool, User) {
        let db = crate::db::init_in_memory().await.unwrap();
        let user = User::create(&db, "neo", "neo@example.com", "hash").await.unwrap();
        (db, user)
    }

    async fn rows_for(db: &SqlitePool, user_id: &str, tmdb_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM interactions WHERE user_id = ? AND tmdb_id = ?")
            .bind(user_id)
            .bind(tmdb_id)
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_set_favorite_creates_minimal_record() {
        let (db, user) = setup().await;

        let created = Interaction::set_favorite(&db, &user.id, 550, MediaType::Movie, true)
            .await
            .unwrap();
        assert!(created.is_favorite);
        assert_eq!(created.media_type, "movie");
        assert_eq!(created.status, None);
        assert_eq!(created.personal_rating, None);
        assert_eq!(created.seasons_watched, 0);
    }

    #[tokio::test]
    async fn test_set_favorite_twice_is_idempotent() {
        let (db, user) = setup().await;

        let first = Interaction::set_favorite(&db, &user.id, 550, MediaType::Movie, true)
            .await
            .unwrap();
        let second = Interaction::set_favorite(&db, &user.id, 550, MediaType::Movie, true)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.is_favorite);
        assert_eq!(rows_for(&db, &user.id, 550).await, 1);
    }

    #[tokio::test]
    async fn test_set_favorite_keeps_other_fields() {
        let (db, user) = setup().await;
        let changes = InteractionChanges {
            status: Some(Some(WatchStatus::Watched)),
            personal_rating: Some(Some(9)),
            ..Default::default()
        };
        Interaction::upsert(&db, &user.id, 550, MediaType::Movie, &changes)
            .await
            .unwrap();

        let updated = Interaction::set_favorite(&db, &user.id, 550, MediaType::Tv, true)
            .await
            .unwrap();
        assert!(updated.is_favorite);
        assert_eq!(updated.status.as_deref(), Some("watched"));
        assert_eq!(updated.personal_rating, Some(9));
        // media type is fixed at creation
        assert_eq!(updated.media_type, "movie");

        let cleared = Interaction::set_favorite(&db, &user.id, 550, MediaType::Movie, false)
            .await
            .unwrap();
        assert!(!cleared.is_favorite);
        assert_eq!(rows_for(&db, &user.id, 550).await, 1);
    }

    #[tokio::test]
    async fn test_upsert_merges_into_single_record() {
        let (db, user) = setup().await;

        Interaction::set_favorite(&db, &user.id, 1399, MediaType::Tv, true)
            .await
            .unwrap();

        let first = Interaction::upsert(
            &db,
            &user.id,
            1399,
            MediaType::Tv,
            &InteractionChanges {
                status: Some(Some(WatchStatus::Watching)),
                seasons_watched: Some(2),
                episodes_watched: Some(14),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(first.is_favorite, "favorite flag survives an upsert that omits it");
        assert_eq!(first.watch_status(), Some(WatchStatus::Watching));
        assert_eq!(first.episodes_watched, 14);

        let second = Interaction::upsert(
            &db,
            &user.id,
            1399,
            MediaType::Tv,
            &InteractionChanges {
                status: Some(Some(WatchStatus::Watched)),
                personal_rating: Some(Some(10)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.watch_status(), Some(WatchStatus::Watched));
        assert_eq!(second.personal_rating, Some(10));
        assert_eq!(second.seasons_watched, 2);
        assert_eq!(rows_for(&db, &user.id, 1399).await, 1);
    }

    #[tokio::test]
    async fn test_average_rating_empty() {
        let (db, user) = setup().await;
        Interaction::set_favorite(&db, &user.id, 550, MediaType::Movie, true)
            .await
            .unwrap();

        let summary = Interaction::average_rating(&db, 550, MediaType::Movie).await.unwrap();
        assert_eq!(summary, RatingSummary { avg_rating: 0.0, count: 0 });
    }

    #[tokio::test]
    async fn test_average_rating_across_users() {
        let (db, _) = setup().await;
        for (i, rating) in [6, 8, 10].into_iter().enumerate() {
            let user = User::create(&db, &format!("u{}", i), &format!("u{}@example.com", i), "hash")
                .await
                .unwrap();
            Interaction::upsert(
                &db,
                &user.id,
                550,
                MediaType::Movie,
                &InteractionChanges {
                    personal_rating: Some(Some(rating)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let summary = Interaction::average_rating(&db, 550, MediaType::Movie).await.unwrap();
        assert_eq!(summary.count, 3);
        assert!((summary.avg_rating - 8.0).abs() < f64::EPSILON);

        // Same id under the other media type is a different title
        let tv = Interaction::average_rating(&db, 550, MediaType::Tv).await.unwrap();
        assert_eq!(tv.count, 0);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (db, user) = setup().await;
        let watched = InteractionChanges {
            status: Some(Some(WatchStatus::Watched)),
            ..Default::default()
        };
        Interaction::upsert(&db, &user.id, 1, MediaType::Movie, &watched).await.unwrap();
        Interaction::upsert(&db, &user.id, 2, MediaType::Tv, &watched).await.unwrap();
        Interaction::set_favorite(&db, &user.id, 3, MediaType::Movie, true).await.unwrap();

        let all = Interaction::list_for_user(&db, &user.id, &InteractionFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let watched_movies = Interaction::list_for_user(
            &db,
            &user.id,
            &InteractionFilter {
                media_type: Some(MediaType::Movie),
                status: Some(WatchStatus::Watched),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(watched_movies.len(), 1);
        assert_eq!(watched_movies[0].tmdb_id, 1);

        let favorites = Interaction::list_for_user(
            &db,
            &user.id,
            &InteractionFilter {
                favorite: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].tmdb_id, 3);
    }

    #[tokio::test]
    async fn test_update_and_delete_are_owner_scoped() {
        let (db, owner) = setup().await;
        let other = User::create(&db, "smith", "smith@example.com", "hash").await.unwrap();
        let interaction = Interaction::set_favorite(&db, &owner.id, 550, MediaType::Movie, true)
            .await
            .unwrap();
        let changes = InteractionChanges {
            personal_rating: Some(Some(3)),
            ..Default::default()
        };

        assert!(Interaction::update_owned(&db, &other.id, &interaction.id, &changes)
            .await
            .unwrap()
            .is_none());
        assert!(!Interaction::delete_owned(&db, &other.id, &interaction.id).await.unwrap());

        let updated = Interaction::update_owned(&db, &owner.id, &interaction.id, &changes)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.personal_rating, Some(3));
        assert!(updated.is_favorite);

        assert!(Interaction::delete_owned(&db, &owner.id, &interaction.id).await.unwrap());
        assert!(!Interaction::delete_for_title(&db, &owner.id, 550).await.unwrap());
    }

    #[tokio::test]
    async fn test_stats_for_user() {
        let (db, user) = setup().await;
        let with_status = |status| InteractionChanges {
            status: Some(Some(status)),
            ..Default::default()
        };
        Interaction::upsert(&db, &user.id, 1, MediaType::Movie, &with_status(WatchStatus::Watched)).await.unwrap();
        Interaction::upsert(&db, &user.id, 2, MediaType::Movie, &with_status(WatchStatus::Watched)).await.unwrap();
        Interaction::upsert(&db, &user.id, 3, MediaType::Tv, &with_status(WatchStatus::Watching)).await.unwrap();
        Interaction::upsert(&db, &user.id, 4, MediaType::Tv, &with_status(WatchStatus::WantToWatch)).await.unwrap();
        Interaction::upsert(&db, &user.id, 5, MediaType::Tv, &with_status(WatchStatus::Dropped)).await.unwrap();
        Interaction::set_favorite(&db, &user.id, 1, MediaType::Movie, true).await.unwrap();
        Interaction::set_favorite(&db, &user.id, 6, MediaType::Movie, true).await.unwrap();

        let stats = Interaction::stats_for_user(&db, &user.id).await.unwrap();
        assert_eq!(
            stats,
            WatchStats {
                watched: 2,
                watching: 1,
                want_to_watch: 1,
                dropped: 1,
                favorites: 2,
                total: 4,
            }
        );
    }

    #[test]
    fn test_upsert_request_flattens_fields() {
        let req: UpsertInteractionRequest = serde_json::from_value(serde_json::json!({
            "tmdbId": 550,
            "mediaType": "movie",
            "status": "watched",
            "personalRating": 8,
            "episodesWatched": 0,
            "userId": "ignored"
        }))
        .unwrap();
        assert_eq!(req.tmdb_id, Some(550));
        assert_eq!(req.fields.status, Some(Some("watched".to_string())));
        assert_eq!(req.fields.personal_rating, Some(Some(8)));
        assert_eq!(req.fields.episodes_watched, Some(0));
        assert_eq!(req.fields.is_favorite, None);
    }

    #[test]
    fn test_null_is_distinct_from_missing() {
        let req: UpsertInteractionRequest = serde_json::from_value(serde_json::json!({
            "tmdbId": 550,
            "mediaType": "movie",
            "personalRating": null,
            "status": null
        }))
        .unwrap();
        assert_eq!(req.fields.personal_rating, Some(None));
        assert_eq!(req.fields.status, Some(None));
        assert_eq!(req.fields.date_watched, None);
    }

    #[tokio::test]
    async fn test_explicit_null_clears_rating_and_status() {
        let (db, user) = setup().await;
        let rated = InteractionChanges {
            status: Some(Some(WatchStatus::Watched)),
            personal_rating: Some(Some(8)),
            date_watched: Some(Some("2024-01-01".to_string())),
            ..Default::default()
        };
        let created = Interaction::upsert(&db, &user.id, 550, MediaType::Movie, &rated)
            .await
            .unwrap();

        // Omitted fields are untouched
        let kept = Interaction::upsert(&db, &user.id, 550, MediaType::Movie, &InteractionChanges::default())
            .await
            .unwrap();
        assert_eq!(kept.personal_rating, Some(8));

        let cleared = Interaction::upsert(
            &db,
            &user.id,
            550,
            MediaType::Movie,
            &InteractionChanges {
                personal_rating: Some(None),
                status: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(cleared.personal_rating, None);
        assert_eq!(cleared.status, None);
        assert_eq!(cleared.date_watched.as_deref(), Some("2024-01-01"));

        let summary = Interaction::average_rating(&db, 550, MediaType::Movie).await.unwrap();
        assert_eq!(summary, RatingSummary { avg_rating: 0.0, count: 0 });

        Interaction::update_owned(
            &db,
            &user.id,
            &created.id,
            &InteractionChanges {
                personal_rating: Some(Some(5)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let updated = Interaction::update_owned(
            &db,
            &user.id,
            &created.id,
            &InteractionChanges {
                date_watched: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(updated.personal_rating, Some(5));
        assert_eq!(updated.date_watched, None);
    }
}
