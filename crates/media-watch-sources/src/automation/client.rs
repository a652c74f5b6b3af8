use async_trait::async_trait;
use media_watch_models::{MediaRef, MediaType};
use tracing::{debug, info};
use crate::automation::api::{episodes_available, RadarrMovie, SonarrEpisode, SonarrSeries};
use crate::error::SourceError;
use crate::http::ApiClient;
use crate::traits::{AvailabilitySource, SourceCheck};

/// Live Radarr (movies) and Sonarr (series) v3 APIs. Either half may be absent.
pub struct ArrApiSource {
    radarr: Option<ApiClient>,
    sonarr: Option<ApiClient>,
}

impl ArrApiSource {
    pub fn new(radarr: Option<ApiClient>, sonarr: Option<ApiClient>) -> Self {
        Self { radarr, sonarr }
    }

    async fn movie(&self, radarr: &ApiClient, tmdb_id: u64) -> Result<SourceCheck, SourceError> {
        let movies: Vec<RadarrMovie> = radarr
            .get_json("api/v3/movie", &[("tmdbId", tmdb_id.to_string())])
            .await?;

        // Older Radarr versions ignore the filter and return the whole library
        let Some(movie) = movies.into_iter().find(|m| m.tmdb_id == Some(tmdb_id)) else {
            debug!(tmdb_id, "Movie not found in Radarr");
            return Ok(SourceCheck::unknown());
        };

        info!(source = "api", title = %movie.title, has_file = movie.has_file, "Radarr movie found");
        let record = serde_json::to_value(&movie).map_err(|e| SourceError::MalformedRecord(e.to_string()))?;
        Ok(SourceCheck::found(movie.has_file, record))
    }

    async fn series(&self, sonarr: &ApiClient, tvdb_id: u32, season: Option<u32>) -> Result<SourceCheck, SourceError> {
        let series: Vec<SonarrSeries> = sonarr
            .get_json("api/v3/series", &[("tvdbId", tvdb_id.to_string())])
            .await?;

        let Some(show) = series.into_iter().find(|s| s.tvdb_id == Some(tvdb_id)) else {
            debug!(tvdb_id, "Series not found in Sonarr");
            return Ok(SourceCheck::unknown());
        };

        let mut query = vec![("seriesId", show.id.to_string())];
        if let Some(season) = season {
            query.push(("seasonNumber", season.to_string()));
        }
        let episodes: Vec<SonarrEpisode> = sonarr.get_json("api/v3/episode", &query).await?;

        let record = serde_json::to_value(&show).map_err(|e| SourceError::MalformedRecord(e.to_string()))?;
        let available = episodes_available(&episodes, season);
        info!(
            source = "api",
            title = %show.title,
            season = ?season,
            episodes = episodes.len(),
            available,
            "Sonarr series found"
        );
        Ok(SourceCheck::found(available, record))
    }
}

#[async_trait]
impl AvailabilitySource for ArrApiSource {
    fn source_name(&self) -> &str {
        "api"
    }

    async fn lookup(&self, media: &MediaRef) -> Result<SourceCheck, SourceError> {
        match media.media_type {
            MediaType::Movie => match &self.radarr {
                Some(radarr) => self.movie(radarr, media.catalog_id).await,
                None => Ok(SourceCheck::unknown()),
            },
            MediaType::Tv => match (&self.sonarr, media.tvdb_id) {
                (Some(sonarr), Some(tvdb_id)) => self.series(sonarr, tvdb_id, media.season).await,
                _ => Ok(SourceCheck::unknown()),
            },
        }
    }

    async fn probe(&self) -> Result<(), SourceError> {
        for client in [&self.radarr, &self.sonarr].into_iter().flatten() {
            let _: serde_json::Value = client.get_json("api/v3/system/status", &[]).await?;
        }
        Ok(())
    }
}
