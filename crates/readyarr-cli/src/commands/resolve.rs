use crate::commands::AppContext;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use media_watch_models::{MediaRef, MediaType};
use media_watch_sources::catalog::tvdb_id_from_details;
use media_watch_sources::{SourceKind, SourceSet};
use owo_colors::OwoColorize;
use serde_json::json;
use tracing::{debug, warn};

/// Build a media reference from command-line flags. Seasons only apply to TV.
pub fn media_from_args(id: u64, media_type: &str, season: Option<u32>, tvdb_id: Option<u32>) -> Result<MediaRef> {
    let media_type: MediaType = media_type.parse().map_err(|e: String| eyre!(e))?;
    if media_type == MediaType::Movie && season.is_some() {
        return Err(eyre!("--season only applies to --type tv"));
    }
    Ok(MediaRef::new(id, media_type, season).with_tvdb_id(tvdb_id))
}

/// Fill in a show's TVDB id from the catalog's details record when the caller
/// did not give one. Without it the database and automation sources cannot
/// find the show.
pub async fn with_catalog_tvdb_id(sources: &SourceSet, media: MediaRef, output: &Output) -> MediaRef {
    if media.is_movie() || media.tvdb_id.is_some() {
        return media;
    }
    let Some(catalog) = sources.get(SourceKind::Catalog) else {
        return media;
    };

    let tvdb_id = match catalog.lookup(&media).await {
        Ok(check) => check.record.as_ref().and_then(tvdb_id_from_details),
        Err(e) => {
            warn!(operation = "tvdb_lookup", media = %media, error = %e, "Catalog details lookup failed");
            None
        }
    };

    match tvdb_id {
        Some(tvdb_id) => {
            debug!(media = %media, tvdb_id, "TVDB id taken from catalog details");
            media.with_tvdb_id(Some(tvdb_id))
        }
        None => {
            output.warn(format!(
                "No TVDB id known for {}; only the catalog source can answer for it",
                media
            ));
            media
        }
    }
}

pub async fn run_resolve(
    context: AppContext,
    id: u64,
    media_type: String,
    season: Option<u32>,
    tvdb_id: Option<u32>,
    output: &Output,
) -> Result<()> {
    let media = media_from_args(id, &media_type, season, tvdb_id)?;
    let resolver = context.resolver()?;
    let media = with_catalog_tvdb_id(resolver.sources(), media, output).await;
    if resolver.sources().is_empty() {
        output.warn("No availability sources are configured; the verdict will be UNKNOWN.");
    }

    let verdict = resolver.resolve(&media).await;

    output.data(&json!({
        "media": media,
        "status": verdict.status,
        "source": verdict.source,
    }));

    let status = if verdict.is_notify_worthy() {
        verdict.status.to_string().green().to_string()
    } else {
        verdict.status.to_string().yellow().to_string()
    };
    output.println(format!("{}  {}  (via {})", media, status, verdict.source.dimmed()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use media_watch_sources::{AvailabilitySource, SourceCheck, SourceError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct DetailsCatalog {
        details: Option<serde_json::Value>,
        calls: AtomicUsize,
    }

    impl DetailsCatalog {
        fn new(details: Option<serde_json::Value>) -> Arc<Self> {
            Arc::new(Self {
                details,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AvailabilitySource for DetailsCatalog {
        fn source_name(&self) -> &str {
            "catalog"
        }

        async fn lookup(&self, _media: &MediaRef) -> Result<SourceCheck, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.details {
                Some(details) => Ok(SourceCheck::found(false, details.clone())),
                None => Err(SourceError::SourceUnavailable("catalog down".to_string())),
            }
        }
    }

    fn quiet() -> Output {
        Output::new(crate::output::OutputFormat::Json, true)
    }

    #[test]
    fn test_media_from_args() {
        let movie = media_from_args(603, "movie", None, None).unwrap();
        assert!(movie.is_movie());

        let show = media_from_args(1399, "TV", Some(2), Some(121361)).unwrap();
        assert_eq!(show.season, Some(2));
        assert_eq!(show.tvdb_id, Some(121361));

        assert!(media_from_args(603, "movie", Some(1), None).is_err());
        assert!(media_from_args(603, "anime", None, None).is_err());
        assert_eq!(media_from_args(1399, " series ", None, None).unwrap().media_type, MediaType::Tv);
    }

    #[tokio::test]
    async fn test_tvdb_id_comes_from_catalog_details() {
        let catalog = DetailsCatalog::new(Some(json!({"id": 1399, "externalIds": {"tvdbId": 121361}})));
        let sources = SourceSet::new().with(SourceKind::Catalog, catalog.clone());

        let media = with_catalog_tvdb_id(&sources, MediaRef::tv(1399, Some(1)), &quiet()).await;
        assert_eq!(media.tvdb_id, Some(121361));
        assert_eq!(media.season, Some(1));
    }

    #[tokio::test]
    async fn test_given_tvdb_id_and_movies_skip_catalog() {
        let catalog = DetailsCatalog::new(Some(json!({"externalIds": {"tvdbId": 1}})));
        let sources = SourceSet::new().with(SourceKind::Catalog, catalog.clone());

        let show = MediaRef::tv(1399, None).with_tvdb_id(Some(121361));
        assert_eq!(with_catalog_tvdb_id(&sources, show, &quiet()).await.tvdb_id, Some(121361));
        assert_eq!(with_catalog_tvdb_id(&sources, MediaRef::movie(603), &quiet()).await.tvdb_id, None);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_catalog_failure_keeps_media_without_tvdb_id() {
        let catalog = DetailsCatalog::new(None);
        let sources = SourceSet::new().with(SourceKind::Catalog, catalog.clone());

        let media = with_catalog_tvdb_id(&sources, MediaRef::tv(1399, None), &quiet()).await;
        assert_eq!(media, MediaRef::tv(1399, None));
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);

        let media = with_catalog_tvdb_id(&SourceSet::new(), MediaRef::tv(1399, None), &quiet()).await;
        assert_eq!(media.tvdb_id, None);
    }
}
