//! Review API endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ApiJson, ApiPath, ApiQuery, ValidationErrorBuilder};
use super::interactions::DeleteResponse;
use super::validation::{
    parse_media_type, validate_page, validate_rating, validate_review_text, validate_tmdb_id,
};
use crate::db::{
    CreateReviewRequest, NewReview, Review, ReviewChanges, ReviewPage, ReviewResponse,
    UpdateReviewRequest, User, VoteAction, VoteRequest, REVIEWS_PER_PAGE,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListQuery {
    pub tmdb_id: Option<i64>,
    pub media_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

/// Load a review the caller may modify
async fn owned_review(state: &AppState, user: &User, id: &str) -> Result<Review, ApiError> {
    let review = Review::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    if review.user_id != user.id {
        tracing::warn!(user_id = %user.id, review_id = %id, "Attempt to modify another user's review");
        return Err(ApiError::unauthorized("You can only modify your own reviews"));
    }

    Ok(review)
}

/// List public reviews, newest first
///
/// GET /api/reviews?tmdbId=&mediaType=
pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ReviewListQuery>,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let media_type = match query.media_type.as_deref() {
        None | Some("") => None,
        value => Some(parse_media_type(value).map_err(|e| ApiError::validation_field("mediaType", e))?),
    };

    let reviews = Review::list_public(&state.db, query.tmdb_id, media_type).await?;
    let reviews = Review::attach_votes(&state.db, reviews).await?;

    Ok(Json(reviews))
}

/// Public reviews for one title, ten per page
///
/// GET /api/reviews/title/:media_type/:tmdb_id?page=
pub async fn list_title_reviews(
    State(state): State<Arc<AppState>>,
    ApiPath((media_type, tmdb_id)): ApiPath<(String, i64)>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ReviewPage>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let media_type = errors.take("mediaType", parse_media_type(Some(&media_type)));
    let tmdb_id = errors.take("tmdbId", validate_tmdb_id(Some(tmdb_id)));
    let page = errors.take("page", validate_page(query.page));
    errors.finish()?;

    let (Some(media_type), Some(tmdb_id), Some(page)) = (media_type, tmdb_id, page) else {
        return Err(ApiError::invalid_input("Invalid title"));
    };

    let page = i64::from(page);
    let (reviews, total) = Review::list_for_title(&state.db, tmdb_id, media_type, page).await?;
    let reviews = Review::attach_votes(&state.db, reviews).await?;

    Ok(Json(ReviewPage {
        reviews,
        page,
        total_pages: (total + REVIEWS_PER_PAGE - 1) / REVIEWS_PER_PAGE,
        total_results: total,
    }))
}

/// Submit a review
///
/// POST /api/reviews
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let tmdb_id = errors.take("tmdbId", validate_tmdb_id(req.tmdb_id));
    let media_type = errors.take("mediaType", parse_media_type(req.media_type.as_deref()));
    match req.rating {
        Some(rating) => {
            errors.check("rating", validate_rating(rating));
        }
        None => {
            errors.add("rating", "Rating is required");
        }
    }
    let review_text = req.review_text.unwrap_or_default();
    errors.check("reviewText", validate_review_text(&review_text));
    errors.finish()?;

    let (Some(tmdb_id), Some(media_type), Some(rating)) = (tmdb_id, media_type, req.rating) else {
        return Err(ApiError::invalid_input("tmdbId, mediaType and rating are required"));
    };

    let new = NewReview {
        tmdb_id,
        media_type,
        rating,
        review_text,
        has_spoilers: req.has_spoilers.unwrap_or(false),
        is_public: req.is_public.unwrap_or(true),
    };

    let review = match Review::create(&state.db, &user.id, &user.username, &new).await {
        Ok(review) => review,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(ApiError::conflict("You have already reviewed this title"));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        user_id = %user.id,
        review_id = %review.id,
        tmdb_id = tmdb_id,
        "Review created"
    );

    Ok((StatusCode::CREATED, Json(review.with_votes(&state.db).await?)))
}

/// Edit one of the caller's reviews
///
/// PUT /api/reviews/:id
pub async fn update_review(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(rating) = req.rating {
        errors.check("rating", validate_rating(rating));
    }
    if let Some(text) = req.review_text.as_deref() {
        errors.check("reviewText", validate_review_text(text));
    }
    errors.finish()?;

    owned_review(&state, &user, &id).await?;

    let changes = ReviewChanges {
        rating: req.rating,
        review_text: req.review_text,
        has_spoilers: req.has_spoilers,
        is_public: req.is_public,
    };
    let review = Review::update(&state.db, &id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    Ok(Json(review.with_votes(&state.db).await?))
}

/// Delete one of the caller's reviews
///
/// DELETE /api/reviews/:id
pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    owned_review(&state, &user, &id).await?;
    Review::delete(&state.db, &id).await?;

    tracing::info!(user_id = %user.id, review_id = %id, "Review deleted");

    Ok(Json(DeleteResponse {
        success: true,
        message: "Review deleted".to_string(),
    }))
}

/// Like, dislike or withdraw a vote on any review
///
/// POST /api/reviews/:id/vote
pub async fn vote_review(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
    ApiJson(req): ApiJson<VoteRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let action: VoteAction = req
        .action
        .as_deref()
        .ok_or_else(|| ApiError::validation_field("action", "action is required"))?
        .parse()
        .map_err(|_| {
            ApiError::validation_field("action", "action must be 'like', 'dislike' or 'none'")
        })?;

    let review = Review::get_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    Review::vote(&state.db, &review.id, &user.id, action)
        .await
        .map_err(vote_error)?;

    Ok(Json(review.with_votes(&state.db).await?))
}

/// A review deleted between lookup and vote fails its foreign key
fn vote_error(err: sqlx::Error) -> ApiError {
    match err {
        sqlx::Error::Database(e) if e.is_foreign_key_violation() => {
            ApiError::not_found("Review not found")
        }
        e => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_vote_on_vanished_review_is_not_found() {
        let pool = db::init_in_memory().await.unwrap();
        let user = User::create(&pool, "neo", "neo@example.com", "hash").await.unwrap();

        let err = Review::vote(&pool, "deleted-review", &user.id, VoteAction::Like)
            .await
            .unwrap_err();
        let err = vote_error(err);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        // Withdrawing a vote never inserts, so it cannot trip the key
        assert!(Review::vote(&pool, "deleted-review", &user.id, VoteAction::None)
            .await
            .is_ok());
    }
}
