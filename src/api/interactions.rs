//! Interaction API endpoints.
//!
//! An interaction is a user's tracking record for one title: watch status,
//! personal rating, favorite flag and episode progress.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ApiJson, ApiPath, ApiQuery, ValidationErrorBuilder};
use super::validation::{
    parse_media_type, parse_status, parse_status_filter, validate_counter, validate_rating,
    validate_tmdb_id,
};
use crate::db::{
    Interaction, InteractionChanges, InteractionFields, InteractionFilter, RatingSummary,
    SetFavoriteRequest, SetFavoriteResponse, UpsertInteractionRequest, User,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionQuery {
    pub tmdb_id: Option<i64>,
    pub media_type: Option<String>,
    pub status: Option<String>,
    pub favorite: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleQuery {
    pub tmdb_id: Option<i64>,
    pub media_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Validate raw request fields into a set of changes, recording problems in `errors`
pub(crate) fn changes_from_fields(
    fields: InteractionFields,
    errors: &mut ValidationErrorBuilder,
) -> InteractionChanges {
    let mut changes = InteractionChanges {
        is_favorite: fields.is_favorite,
        date_watched: fields.date_watched,
        ..Default::default()
    };

    // An explicit null clears the stored status or rating
    match fields.status {
        Some(Some(status)) => {
            changes.status = errors.take("status", parse_status(&status)).map(Some);
        }
        Some(None) => changes.status = Some(None),
        None => {}
    }
    if let Some(rating) = fields.personal_rating {
        if let Some(rating) = rating {
            errors.check("personalRating", validate_rating(rating));
        }
        changes.personal_rating = Some(rating);
    }
    if let Some(seasons) = fields.seasons_watched {
        errors.check("seasonsWatched", validate_counter(seasons));
        changes.seasons_watched = Some(seasons);
    }
    if let Some(episodes) = fields.episodes_watched {
        errors.check("episodesWatched", validate_counter(episodes));
        changes.episodes_watched = Some(episodes);
    }

    changes
}

/// List the caller's interactions
///
/// GET /api/interactions?tmdbId=&mediaType=&status=&favorite=
pub async fn list_interactions(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiQuery(query): ApiQuery<InteractionQuery>,
) -> Result<Json<Vec<Interaction>>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let media_type = match query.media_type.as_deref() {
        None | Some("") => None,
        value => errors.take("mediaType", parse_media_type(value)),
    };
    let status = errors
        .take("status", parse_status_filter(query.status.as_deref()))
        .flatten();
    errors.finish()?;

    let filter = InteractionFilter {
        tmdb_id: query.tmdb_id,
        media_type,
        status,
        favorite: query.favorite,
    };
    let interactions = Interaction::list_for_user(&state.db, &user.id, &filter).await?;

    Ok(Json(interactions))
}

/// Create or update the caller's interaction for a title
///
/// POST /api/interactions
pub async fn upsert_interaction(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<UpsertInteractionRequest>,
) -> Result<Json<Interaction>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let tmdb_id = errors.take("tmdbId", validate_tmdb_id(req.tmdb_id));
    let media_type = errors.take("mediaType", parse_media_type(req.media_type.as_deref()));
    let changes = changes_from_fields(req.fields, &mut errors);
    errors.finish()?;

    let (Some(tmdb_id), Some(media_type)) = (tmdb_id, media_type) else {
        return Err(ApiError::invalid_input("tmdbId and mediaType are required"));
    };

    let interaction =
        Interaction::upsert(&state.db, &user.id, tmdb_id, media_type, &changes).await?;

    tracing::debug!(
        user_id = %user.id,
        tmdb_id = tmdb_id,
        interaction_id = %interaction.id,
        "Interaction saved"
    );

    Ok(Json(interaction))
}

/// Delete the caller's interaction for a title
///
/// DELETE /api/interactions?tmdbId=
pub async fn delete_interaction(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiQuery(query): ApiQuery<TitleQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let tmdb_id = validate_tmdb_id(query.tmdb_id)
        .map_err(|e| ApiError::validation_field("tmdbId", e))?;

    if !Interaction::delete_for_title(&state.db, &user.id, tmdb_id).await? {
        return Err(ApiError::not_found("Interaction not found"));
    }

    Ok(Json(DeleteResponse {
        success: true,
        message: "Interaction deleted".to_string(),
    }))
}

/// Partially update one of the caller's interactions
///
/// PUT /api/interactions/:id
pub async fn update_interaction(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
    ApiJson(fields): ApiJson<InteractionFields>,
) -> Result<Json<Interaction>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let changes = changes_from_fields(fields, &mut errors);
    errors.finish()?;

    let interaction = Interaction::update_owned(&state.db, &user.id, &id, &changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Interaction not found"))?;

    Ok(Json(interaction))
}

/// Delete one of the caller's interactions by id
///
/// DELETE /api/interactions/:id
pub async fn delete_interaction_by_id(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !Interaction::delete_owned(&state.db, &user.id, &id).await? {
        return Err(ApiError::not_found("Interaction not found"));
    }

    Ok(Json(DeleteResponse {
        success: true,
        message: "Interaction deleted".to_string(),
    }))
}

/// Mark or unmark a title as a favorite
///
/// PUT /api/interactions/favorite
pub async fn set_favorite(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<SetFavoriteRequest>,
) -> Result<Json<SetFavoriteResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let tmdb_id = errors.take("tmdbId", validate_tmdb_id(req.tmdb_id));
    let media_type = errors.take("mediaType", parse_media_type(req.media_type.as_deref()));
    if req.is_favorite.is_none() {
        errors.add("isFavorite", "isFavorite is required");
    }
    errors.finish()?;

    let (Some(tmdb_id), Some(media_type), Some(is_favorite)) =
        (tmdb_id, media_type, req.is_favorite)
    else {
        return Err(ApiError::invalid_input("tmdbId, mediaType and isFavorite are required"));
    };

    let interaction =
        Interaction::set_favorite(&state.db, &user.id, tmdb_id, media_type, is_favorite).await?;

    let message = if is_favorite {
        "Added to favorites"
    } else {
        "Removed from favorites"
    };

    Ok(Json(SetFavoriteResponse {
        success: true,
        message: message.to_string(),
        interaction: interaction.into(),
    }))
}

/// Mean personal rating for a title across all users
///
/// GET /api/interactions/average?tmdbId=&mediaType=
pub async fn average_rating(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TitleQuery>,
) -> Result<Json<RatingSummary>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let tmdb_id = errors.take("tmdbId", validate_tmdb_id(query.tmdb_id));
    let media_type = errors.take("mediaType", parse_media_type(query.media_type.as_deref()));
    errors.finish()?;

    let (Some(tmdb_id), Some(media_type)) = (tmdb_id, media_type) else {
        return Err(ApiError::invalid_input("tmdbId and mediaType are required"));
    };

    let summary = Interaction::average_rating(&state.db, tmdb_id, media_type).await?;
    Ok(Json(summary))
}
