//! Common types and utilities shared across models.

use serde::{Deserialize, Serialize};

/// Current time in the RFC 3339 form every table stores
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Kind of title in the catalog. Catalog ids are only unique within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            _ => Err(format!("Unknown media type: {}", s)),
        }
    }
}

/// Where a title sits on the user's list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    Watched,
    Watching,
    WantToWatch,
    Dropped,
}

impl WatchStatus {
    pub const ALL: [WatchStatus; 4] = [
        WatchStatus::Watched,
        WatchStatus::Watching,
        WatchStatus::WantToWatch,
        WatchStatus::Dropped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::Watched => "watched",
            WatchStatus::Watching => "watching",
            WatchStatus::WantToWatch => "want_to_watch",
            WatchStatus::Dropped => "dropped",
        }
    }
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "watched" => Ok(WatchStatus::Watched),
            "watching" => Ok(WatchStatus::Watching),
            "want_to_watch" => Ok(WatchStatus::WantToWatch),
            "dropped" => Ok(WatchStatus::Dropped),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_parse() {
        assert_eq!("movie".parse::<MediaType>(), Ok(MediaType::Movie));
        assert_eq!("TV".parse::<MediaType>(), Ok(MediaType::Tv));
        assert!("person".parse::<MediaType>().is_err());
        assert_eq!(MediaType::Tv.to_string(), "tv");
    }

    #[test]
    fn test_watch_status_parse() {
        for status in WatchStatus::ALL {
            assert_eq!(status.as_str().parse::<WatchStatus>(), Ok(status));
        }
        assert!("finished".parse::<WatchStatus>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&WatchStatus::WantToWatch).unwrap(),
            "\"want_to_watch\""
        );
        assert_eq!(serde_json::to_string(&MediaType::Movie).unwrap(), "\"movie\"");
    }
}
