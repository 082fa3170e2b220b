//! Per-user views: watchlist, favorites, reviews, stats and account removal.

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::cleared_cookie;
use super::error::{ApiError, ApiJson, ApiQuery, ValidationErrorBuilder};
use super::validation::{parse_media_type, parse_status, parse_status_filter, validate_tmdb_id};
use crate::catalog::{enrich_interactions, EnrichedTitle};
use crate::db::{
    AccountDeletion, AddToWatchlistRequest, Interaction, InteractionChanges, InteractionFilter,
    Review, ReviewResponse, User, WatchStats,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AccountDeletedResponse {
    pub success: bool,
    pub message: String,
    pub deleted: AccountDeletion,
}

/// Interactions that carry a watch status, optionally narrowed to one.
/// Rows with only a favorite flag are left out.
async fn watchlist_items(
    state: &AppState,
    user: &User,
    status: Option<&str>,
) -> Result<Vec<Interaction>, ApiError> {
    let status =
        parse_status_filter(status).map_err(|e| ApiError::validation_field("status", e))?;
    let filter = InteractionFilter {
        status,
        ..Default::default()
    };

    let items = Interaction::list_for_user(&state.db, &user.id, &filter).await?;
    Ok(items.into_iter().filter(|i| i.status.is_some()).collect())
}

/// The caller's watchlist: interactions with a watch status. Favorite-only
/// rows are excluded, even for `status=all`.
///
/// GET /api/users/watchlist?status=
pub async fn get_watchlist(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<Json<Vec<Interaction>>, ApiError> {
    let items = watchlist_items(&state, &user, query.status.as_deref()).await?;
    Ok(Json(items))
}

/// Put a title on the watchlist, or move it to another status
///
/// POST /api/users/watchlist
pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<AddToWatchlistRequest>,
) -> Result<Json<Interaction>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let tmdb_id = errors.take("tmdbId", validate_tmdb_id(req.tmdb_id));
    let media_type = errors.take("mediaType", parse_media_type(req.media_type.as_deref()));
    let status = match req.status.as_deref() {
        None | Some("") => {
            errors.add("status", "status is required");
            None
        }
        Some(status) => errors.take("status", parse_status(status)),
    };
    errors.finish()?;

    let (Some(tmdb_id), Some(media_type), Some(status)) = (tmdb_id, media_type, status) else {
        return Err(ApiError::invalid_input("tmdbId, mediaType and status are required"));
    };

    let changes = InteractionChanges {
        status: Some(Some(status)),
        ..Default::default()
    };
    let interaction =
        Interaction::upsert(&state.db, &user.id, tmdb_id, media_type, &changes).await?;

    Ok(Json(interaction))
}

/// Watchlist merged with catalog details
///
/// GET /api/users/watchlist/enriched?status=
pub async fn get_enriched_watchlist(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<Json<Vec<EnrichedTitle>>, ApiError> {
    let items = watchlist_items(&state, &user, query.status.as_deref()).await?;
    let enriched = enrich_interactions(state.catalog.as_ref(), &items).await;

    tracing::debug!(
        user_id = %user.id,
        requested = items.len(),
        returned = enriched.len(),
        "Enriched watchlist"
    );

    Ok(Json(enriched))
}

/// Favorites merged with catalog details
///
/// GET /api/users/favorites
pub async fn get_favorites(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<EnrichedTitle>>, ApiError> {
    let filter = InteractionFilter {
        favorite: Some(true),
        ..Default::default()
    };
    let favorites = Interaction::list_for_user(&state.db, &user.id, &filter).await?;
    let enriched = enrich_interactions(state.catalog.as_ref(), &favorites).await;

    Ok(Json(enriched))
}

/// Every review the caller wrote
///
/// GET /api/users/reviews
pub async fn get_user_reviews(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let reviews = Review::list_for_user(&state.db, &user.id).await?;
    Ok(Json(Review::attach_votes(&state.db, reviews).await?))
}

/// Counts per watch status
///
/// GET /api/users/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<WatchStats>, ApiError> {
    Ok(Json(Interaction::stats_for_user(&state.db, &user.id).await?))
}

/// Delete the caller's account and everything it owns
///
/// DELETE /api/users/account
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, Json<AccountDeletedResponse>), ApiError> {
    let deleted = User::delete_cascade(&state.db, &user.id).await?;

    tracing::info!(
        user_id = %user.id,
        interactions = deleted.interactions,
        reviews = deleted.reviews,
        votes = deleted.votes,
        "Account deleted"
    );

    Ok((
        jar.add(cleared_cookie(&state.config)),
        Json(AccountDeletedResponse {
            success: true,
            message: "Account deleted".to_string(),
            deleted,
        }),
    ))
}
