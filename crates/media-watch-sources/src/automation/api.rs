use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarrMovie {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    #[serde(default)]
    pub has_file: bool,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrSeries {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub tvdb_id: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrEpisode {
    pub season_number: u32,
    #[serde(default)]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub has_file: bool,
}

/// Requested season: every episode has a file (and there is at least one).
/// Whole show: any episode has a file.
pub fn episodes_available(episodes: &[SonarrEpisode], season: Option<u32>) -> bool {
    match season {
        Some(number) => {
            let in_season: Vec<_> = episodes.iter().filter(|e| e.season_number == number).collect();
            let with_file = in_season.iter().filter(|e| e.has_file).count();
            with_file > 0 && with_file == in_season.len()
        }
        None => episodes.iter().any(|e| e.has_file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(season_number: u32, has_file: bool) -> SonarrEpisode {
        SonarrEpisode {
            season_number,
            episode_number: None,
            has_file,
        }
    }

    #[test]
    fn test_season_requires_every_episode() {
        let episodes = vec![episode(1, true), episode(1, true), episode(2, true), episode(2, false)];
        assert!(episodes_available(&episodes, Some(1)));
        assert!(!episodes_available(&episodes, Some(2)));
        assert!(!episodes_available(&episodes, Some(3)));
    }

    #[test]
    fn test_show_needs_any_file() {
        assert!(episodes_available(&[episode(1, false), episode(2, true)], None));
        assert!(!episodes_available(&[episode(1, false)], None));
        assert!(!episodes_available(&[], None));
    }

    #[test]
    fn test_deserialize_radarr_movie() {
        let movie: RadarrMovie = serde_json::from_str(
            r#"{"id": 12, "title": "The Matrix", "year": 1999, "tmdbId": 603, "hasFile": true, "monitored": true}"#,
        )
        .unwrap();
        assert_eq!(movie.tmdb_id, Some(603));
        assert!(movie.has_file);
    }
}
