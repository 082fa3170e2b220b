//! Merge catalog details into a user's tracked titles.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::genres::genre_names;
use super::CatalogApi;
use crate::db::{Interaction, MediaType};

/// The subset of a TMDB movie or series detail payload we read
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TitleDetails {
    pub id: i64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub vote_average: Option<f64>,
    pub genre_ids: Vec<i64>,
    pub genres: Vec<GenreRef>,
    pub overview: Option<String>,
    pub number_of_episodes: Option<i64>,
    pub number_of_seasons: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenreRef {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTitle {
    pub id: i64,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: f64,
    pub genre_ids: Vec<i64>,
    pub genres: Vec<String>,
    pub overview: Option<String>,
    pub media_type: String,
    pub user_status: Option<String>,
    pub user_rating: Option<i64>,
    pub is_favorite: bool,
    pub episodes_watched: i64,
    pub total_episodes: Option<i64>,
    pub total_seasons: Option<i64>,
}

impl EnrichedTitle {
    pub fn merge(details: TitleDetails, interaction: &Interaction) -> Self {
        // Detail payloads carry `genres`, list payloads carry `genre_ids`
        let genre_ids = if details.genre_ids.is_empty() {
            details.genres.iter().map(|g| g.id).collect()
        } else {
            details.genre_ids
        };

        Self {
            id: details.id,
            title: details
                .title
                .or(details.name)
                .unwrap_or_else(|| "Unknown Title".to_string()),
            poster_path: details.poster_path,
            release_date: details.release_date.or(details.first_air_date),
            vote_average: round_one_decimal(details.vote_average.unwrap_or(0.0)),
            genres: genre_names(&genre_ids),
            genre_ids,
            overview: details.overview,
            media_type: interaction.media_type.clone(),
            user_status: interaction.status.clone(),
            user_rating: interaction.personal_rating,
            is_favorite: interaction.is_favorite,
            episodes_watched: interaction.episodes_watched,
            total_episodes: details.number_of_episodes,
            total_seasons: details.number_of_seasons,
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

async fn enrich_one(catalog: &dyn CatalogApi, interaction: &Interaction) -> Option<EnrichedTitle> {
    let media_type: MediaType = match interaction.media_type.parse() {
        Ok(media_type) => media_type,
        Err(e) => {
            warn!(interaction_id = %interaction.id, "Skipping interaction: {}", e);
            return None;
        }
    };

    let payload = match catalog.details(media_type, interaction.tmdb_id).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(
                tmdb_id = interaction.tmdb_id,
                media_type = %media_type,
                "Failed to fetch title details: {}",
                e
            );
            return None;
        }
    };

    match serde_json::from_value::<TitleDetails>(payload) {
        Ok(details) => Some(EnrichedTitle::merge(details, interaction)),
        Err(e) => {
            warn!(tmdb_id = interaction.tmdb_id, "Unexpected title details payload: {}", e);
            None
        }
    }
}

/// Fetch details for every interaction concurrently. Titles whose lookup
/// fails are left out of the result; order follows the input.
pub async fn enrich_interactions(
    catalog: &dyn CatalogApi,
    interactions: &[Interaction],
) -> Vec<EnrichedTitle> {
    join_all(interactions.iter().map(|i| enrich_one(catalog, i)))
        .await
        .into_iter()
        .flatten()
        .collect()
}
