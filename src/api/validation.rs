//! Input validation for API requests.
//!
//! Validators return `Err(message)` so handlers can feed them into a
//! `ValidationErrorBuilder` and report every bad field at once.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{MediaType, WatchStatus};

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_REVIEW_LENGTH: usize = 1000;

lazy_static! {
    /// Usernames: 3-32 letters, digits, dots, dashes or underscores
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();

    /// Loose email shape check: something@something
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap();
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(format!(
            "Email is too long (max {} characters)",
            MAX_EMAIL_LENGTH
        ));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username must be 3-32 characters of letters, digits, '.', '-' or '_'".to_string(),
        );
    }

    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }

    Ok(())
}

pub fn validate_rating(rating: i64) -> Result<(), String> {
    if !(1..=10).contains(&rating) {
        return Err("Rating must be between 1 and 10".to_string());
    }
    Ok(())
}

pub fn validate_review_text(text: &str) -> Result<(), String> {
    if text.trim().is_empty() {
        return Err("Review text is required".to_string());
    }

    if text.chars().count() > MAX_REVIEW_LENGTH {
        return Err(format!(
            "Review text is too long (max {} characters)",
            MAX_REVIEW_LENGTH
        ));
    }

    Ok(())
}

/// Progress counters such as episodes watched
pub fn validate_counter(value: i64) -> Result<(), String> {
    if value < 0 {
        return Err("Must not be negative".to_string());
    }
    Ok(())
}

pub fn validate_tmdb_id(id: Option<i64>) -> Result<i64, String> {
    match id {
        None => Err("tmdbId is required".to_string()),
        Some(id) if id <= 0 => Err("tmdbId must be a positive integer".to_string()),
        Some(id) => Ok(id),
    }
}

pub fn parse_media_type(value: Option<&str>) -> Result<MediaType, String> {
    match value {
        None | Some("") => Err("mediaType is required".to_string()),
        Some(value) => value
            .parse()
            .map_err(|_| "mediaType must be 'movie' or 'tv'".to_string()),
    }
}

pub fn parse_status(value: &str) -> Result<WatchStatus, String> {
    value.parse().map_err(|_| {
        let allowed: Vec<&str> = WatchStatus::ALL.iter().map(|s| s.as_str()).collect();
        format!("Invalid status. Must be one of: {}", allowed.join(", "))
    })
}

/// Status filter from a query string. Absent, empty and `all` mean no filter.
pub fn parse_status_filter(value: Option<&str>) -> Result<Option<WatchStatus>, String> {
    match value {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => parse_status(value).map(Some),
    }
}

/// Page numbers start at 1; absent means the first page
pub fn validate_page(page: Option<u32>) -> Result<u32, String> {
    match page {
        None => Ok(1),
        Some(0) => Err("page must be at least 1".to_string()),
        Some(page) => Ok(page),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("neo@example.com").is_ok());
        assert!(validate_email("a@b").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("neo.example.com").is_err());
        assert!(validate_email("neo@exa mple.com").is_err());

        let long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("neo").is_ok());
        assert!(validate_username("mr.anderson_99").is_ok());
        assert!(validate_username("a-b").is_ok());

        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("emoji🙂").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_validate_rating() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(10).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(11).is_err());
    }

    #[test]
    fn test_validate_review_text() {
        assert!(validate_review_text("Great").is_ok());
        assert!(validate_review_text(&"a".repeat(1000)).is_ok());
        assert!(validate_review_text(&"a".repeat(1001)).is_err());
        assert!(validate_review_text("   ").is_err());
    }

    #[test]
    fn test_parse_media_type() {
        assert_eq!(parse_media_type(Some("movie")), Ok(MediaType::Movie));
        assert_eq!(parse_media_type(Some("tv")), Ok(MediaType::Tv));
        assert!(parse_media_type(Some("person")).is_err());
        assert!(parse_media_type(None).is_err());
    }

    #[test]
    fn test_parse_status_filter() {
        assert_eq!(parse_status_filter(None), Ok(None));
        assert_eq!(parse_status_filter(Some("all")), Ok(None));
        assert_eq!(
            parse_status_filter(Some("want_to_watch")),
            Ok(Some(WatchStatus::WantToWatch))
        );
        assert!(parse_status_filter(Some("finished")).is_err());
    }

    #[test]
    fn test_validate_page_and_ids() {
        assert_eq!(validate_page(None), Ok(1));
        assert_eq!(validate_page(Some(3)), Ok(3));
        assert!(validate_page(Some(0)).is_err());

        assert_eq!(validate_tmdb_id(Some(550)), Ok(550));
        assert!(validate_tmdb_id(Some(0)).is_err());
        assert!(validate_tmdb_id(None).is_err());
        assert!(validate_counter(-1).is_err());
        assert!(validate_counter(0).is_ok());
    }
}
