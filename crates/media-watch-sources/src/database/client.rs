use async_trait::async_trait;
use media_watch_config::DatabaseConfig;
use media_watch_models::{MediaRef, MediaType};
use serde_json::{json, Value};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, info};
use crate::database::seasons::season_files_available;
use crate::error::SourceError;
use crate::retry::{with_retry, RetryPolicy};
use crate::traits::{AvailabilitySource, SourceCheck};

/// Reads the Postgres mirror of the Radarr/Sonarr libraries.
pub struct ArrDatabaseSource {
    pool: PgPool,
    schema: String,
    retry: RetryPolicy,
}

impl ArrDatabaseSource {
    /// The pool connects lazily: an unreachable database only shows up as
    /// failed lookups, never as a startup error.
    pub fn new(config: &DatabaseConfig, password: Option<&str>, retry: RetryPolicy) -> Self {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user);
        if let Some(password) = password {
            options = options.password(password);
        }

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(options);

        Self {
            pool,
            schema: config.schema.clone(),
            retry,
        }
    }

    async fn movie(&self, tmdb_id: u64) -> Result<SourceCheck, SourceError> {
        let query = format!(
            "SELECT tmdbid::bigint AS tmdbid, title::text AS title, year::bigint AS year, \
             hasfile, status::text AS status FROM {}.radarr WHERE tmdbid = $1",
            self.schema
        );
        let tmdb_id = i64::try_from(tmdb_id)
            .map_err(|_| SourceError::MalformedRecord(format!("tmdb id {} out of range", tmdb_id)))?;

        let (query, pool) = (query.as_str(), &self.pool);
        let row = with_retry(&self.retry, "db_movie", || async move {
            sqlx::query(query).bind(tmdb_id).fetch_optional(pool).await.map_err(SourceError::from)
        })
        .await?;

        let Some(row) = row else {
            debug!(tmdb_id, "Movie not found in Radarr database");
            return Ok(SourceCheck::unknown());
        };

        let has_file: Option<bool> = row.try_get("hasfile")?;
        let record = json!({
            "tmdbid": row.try_get::<Option<i64>, _>("tmdbid")?,
            "title": row.try_get::<Option<String>, _>("title")?,
            "year": row.try_get::<Option<i64>, _>("year")?,
            "hasfile": has_file,
            "status": row.try_get::<Option<String>, _>("status")?,
        });

        info!(
            source = "db",
            title = record["title"].as_str().unwrap_or_default(),
            hasfile = has_file.unwrap_or(false),
            "Movie found in Radarr database"
        );
        Ok(SourceCheck::found(has_file == Some(true), record))
    }

    async fn series(&self, tvdb_id: u32, season: Option<u32>) -> Result<SourceCheck, SourceError> {
        let query = format!(
            "SELECT id::bigint AS id, tvdbid::bigint AS tvdbid, title::text AS title, year::bigint AS year, \
             status::text AS status, seasons::jsonb AS seasons FROM {}.sonarr WHERE tvdbid = $1",
            self.schema
        );

        let (query, pool) = (query.as_str(), &self.pool);
        let row = with_retry(&self.retry, "db_series", || async move {
            sqlx::query(query).bind(i64::from(tvdb_id)).fetch_optional(pool).await.map_err(SourceError::from)
        })
        .await?;

        let Some(row) = row else {
            debug!(tvdb_id, "Series not found in Sonarr database");
            return Ok(SourceCheck::unknown());
        };

        let seasons: Option<Json<Value>> = row.try_get("seasons")?;
        let seasons = match seasons.map(|s| s.0) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let record = json!({
            "id": row.try_get::<Option<i64>, _>("id")?,
            "tvdbid": row.try_get::<Option<i64>, _>("tvdbid")?,
            "title": row.try_get::<Option<String>, _>("title")?,
            "year": row.try_get::<Option<i64>, _>("year")?,
            "status": row.try_get::<Option<String>, _>("status")?,
            "seasons": seasons,
        });

        if seasons.is_empty() {
            debug!(tvdb_id, "Series has no season data");
            return Ok(SourceCheck::found(false, record));
        }

        let available = season_files_available(&seasons, season);
        info!(
            source = "db",
            title = record["title"].as_str().unwrap_or_default(),
            season = ?season,
            available,
            "Series found in Sonarr database"
        );
        Ok(SourceCheck::found(available, record))
    }

    /// Round-trip `SELECT 1`.
    pub async fn ping(&self) -> Result<(), SourceError> {
        let value: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        if value == 1 {
            Ok(())
        } else {
            Err(SourceError::SourceUnavailable("unexpected ping result".to_string()))
        }
    }
}

#[async_trait]
impl AvailabilitySource for ArrDatabaseSource {
    fn source_name(&self) -> &str {
        "db"
    }

    async fn lookup(&self, media: &MediaRef) -> Result<SourceCheck, SourceError> {
        match media.media_type {
            MediaType::Movie => self.movie(media.catalog_id).await,
            MediaType::Tv => match media.tvdb_id {
                Some(tvdb_id) => self.series(tvdb_id, media.season).await,
                None => {
                    debug!(media = %media, "No external show id, skipping database lookup");
                    Ok(SourceCheck::unknown())
                }
            },
        }
    }

    async fn probe(&self) -> Result<(), SourceError> {
        self.ping().await
    }
}
