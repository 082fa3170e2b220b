//! Catalog proxy endpoints. Responses are TMDB payloads passed through as-is.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use super::error::{ApiError, ApiPath, ApiQuery, ValidationErrorBuilder};
use super::validation::{parse_media_type, validate_page, validate_tmdb_id};
use crate::catalog::genres::{all_genres, Genre};
use crate::catalog::TimeWindow;
use crate::db::MediaType;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingQuery {
    pub page: Option<u32>,
    pub time_window: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleRefQuery {
    pub id: Option<i64>,
    pub media_type: Option<String>,
    pub page: Option<u32>,
}

fn page_or_400(page: Option<u32>) -> Result<u32, ApiError> {
    validate_page(page).map_err(|e| ApiError::validation_field("page", e))
}

/// Resolve `?id=&mediaType=&page=` into typed values
fn title_ref(query: &TitleRefQuery) -> Result<(MediaType, i64, u32), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    let id = errors.take("id", validate_tmdb_id(query.id));
    let media_type = errors.take("mediaType", parse_media_type(query.media_type.as_deref()));
    let page = errors.take("page", validate_page(query.page));
    errors.finish()?;

    match (media_type, id, page) {
        (Some(media_type), Some(id), Some(page)) => Ok((media_type, id, page)),
        _ => Err(ApiError::invalid_input("id and mediaType are required")),
    }
}

/// GET /api/movies/trending?page=&timeWindow=day|week
pub async fn trending(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TrendingQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = page_or_400(query.page)?;
    let window = match query.time_window.as_deref() {
        None | Some("") => TimeWindow::default(),
        Some(value) => value
            .parse()
            .map_err(|_| ApiError::validation_field("timeWindow", "timeWindow must be 'day' or 'week'"))?,
    };

    Ok(Json(state.catalog.trending(window, page).await?))
}

/// GET /api/movies/popular?page=
pub async fn popular_movies(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = page_or_400(query.page)?;
    Ok(Json(state.catalog.popular(MediaType::Movie, page).await?))
}

/// GET /api/tv/popular?page=
pub async fn popular_tv(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = page_or_400(query.page)?;
    Ok(Json(state.catalog.popular(MediaType::Tv, page).await?))
}

/// GET /api/search/multi?query=&page=
pub async fn search_multi(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let term = query.query.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return Err(ApiError::validation_field("query", "Search query is required"));
    }
    let page = page_or_400(query.page)?;

    Ok(Json(state.catalog.search_multi(term, page).await?))
}

/// GET /api/details/:media_type/:id
pub async fn details(
    State(state): State<Arc<AppState>>,
    ApiPath((media_type, id)): ApiPath<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let media_type = parse_media_type(Some(&media_type))
        .map_err(|e| ApiError::validation_field("mediaType", e))?;

    Ok(Json(state.catalog.details(media_type, id).await?))
}

/// GET /api/details/casts?id=&mediaType=
pub async fn casts(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TitleRefQuery>,
) -> Result<Json<Value>, ApiError> {
    let (media_type, id, _) = title_ref(&query)?;
    Ok(Json(state.catalog.credits(media_type, id).await?))
}

/// GET /api/details/similars?id=&mediaType=&page=
pub async fn similars(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<TitleRefQuery>,
) -> Result<Json<Value>, ApiError> {
    let (media_type, id, page) = title_ref(&query)?;
    Ok(Json(state.catalog.recommendations(media_type, id, page).await?))
}

/// GET /api/genres
pub async fn genres() -> Json<Vec<Genre>> {
    Json(all_genres())
}
