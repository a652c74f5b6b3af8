use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
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

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(MediaType::Movie),
            "tv" | "show" | "series" => Ok(MediaType::Tv),
            other => Err(format!("Invalid media type: {}. Use 'movie' or 'tv'", other)),
        }
    }
}

/// A requested unit of media: a movie, a whole show, or one season of a show.
///
/// `catalog_id` is the catalog service's id (TMDB numbering). `tvdb_id` is the
/// external show id the automation services index series by; it is captured
/// when the request is made and is not part of the item's identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaRef {
    pub catalog_id: u64,
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb_id: Option<u32>,
}

/// Identity of a `MediaRef` for deduplication and lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaKey {
    pub catalog_id: u64,
    pub media_type: MediaType,
    pub season: Option<u32>,
}

impl MediaRef {
    pub fn movie(catalog_id: u64) -> Self {
        Self {
            catalog_id,
            media_type: MediaType::Movie,
            season: None,
            tvdb_id: None,
        }
    }

    pub fn tv(catalog_id: u64, season: Option<u32>) -> Self {
        Self {
            catalog_id,
            media_type: MediaType::Tv,
            season,
            tvdb_id: None,
        }
    }

    /// Build a reference, dropping any season given for a movie.
    pub fn new(catalog_id: u64, media_type: MediaType, season: Option<u32>) -> Self {
        match media_type {
            MediaType::Movie => Self::movie(catalog_id),
            MediaType::Tv => Self::tv(catalog_id, season),
        }
    }

    pub fn with_tvdb_id(mut self, tvdb_id: Option<u32>) -> Self {
        self.tvdb_id = tvdb_id;
        self
    }

    pub fn key(&self) -> MediaKey {
        MediaKey {
            catalog_id: self.catalog_id,
            media_type: self.media_type,
            season: self.season,
        }
    }

    pub fn is_movie(&self) -> bool {
        self.media_type == MediaType::Movie
    }

    /// Seasons the requester asked for. Empty means the whole show (or a movie).
    pub fn requested_seasons(&self) -> Vec<u32> {
        match (self.media_type, self.season) {
            (MediaType::Tv, Some(season)) => vec![season],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.season {
            Some(season) => write!(f, "{}:{}:s{}", self.media_type, self.catalog_id, season),
            None => write!(f, "{}:{}", self.media_type, self.catalog_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_drops_season() {
        let media = MediaRef::new(603, MediaType::Movie, Some(2));
        assert_eq!(media.season, None);
        assert!(media.requested_seasons().is_empty());
    }

    #[test]
    fn test_key_ignores_tvdb_id() {
        let a = MediaRef::tv(1399, Some(1)).with_tvdb_id(Some(121361));
        let b = MediaRef::tv(1399, Some(1));
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), MediaRef::tv(1399, Some(2)).key());
    }

    #[test]
    fn test_media_type_parse() {
        assert_eq!("TV".parse::<MediaType>().unwrap(), MediaType::Tv);
        assert_eq!("movie".parse::<MediaType>().unwrap(), MediaType::Movie);
        assert!("album".parse::<MediaType>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(MediaRef::movie(603).to_string(), "movie:603");
        assert_eq!(MediaRef::tv(1399, Some(3)).to_string(), "tv:1399:s3");
    }
}
