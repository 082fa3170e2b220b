//! TMDB genre ids for movies and series.

use serde::Serialize;

pub const GENRES: &[(i64, &str)] = &[
    (28, "Action"),
    (12, "Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Science Fiction"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
    // Series only
    (10759, "Action & Adventure"),
    (10762, "Kids"),
    (10763, "News"),
    (10764, "Reality"),
    (10765, "Sci-Fi & Fantasy"),
    (10766, "Soap"),
    (10767, "Talk"),
    (10768, "War & Politics"),
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: &'static str,
}

pub fn genre_name(id: i64) -> &'static str {
    GENRES
        .iter()
        .find(|(genre_id, _)| *genre_id == id)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown Genre")
}

pub fn genre_names(ids: &[i64]) -> Vec<String> {
    ids.iter().map(|id| genre_name(*id).to_string()).collect()
}

pub fn all_genres() -> Vec<Genre> {
    GENRES.iter().map(|(id, name)| Genre { id: *id, name }).collect()
}
