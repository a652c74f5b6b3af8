pub mod catalog;


use media_watch_models::{CanonicalStatus, MediaRef, Verdict};
use media_watch_sources::{SourceKind, SourceSet};
use tracing::{debug, info};

/// Decides whether a requested item is ready to watch.
///
/// Sources are asked in precedence order (automation database, automation
/// API, catalog) and the first conclusive answer stands. Direct file evidence
/// always overrides the catalog, which can lag behind the services that hold
/// the files.
pub struct Resolver {
    sources: SourceSet,
}

impl Resolver {
    pub fn new(sources: SourceSet) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Never fails. Every path yields a verdict with a non-empty source tag.
    pub async fn resolve(&self, media: &MediaRef) -> Verdict {
        for (kind, source) in self.sources.in_precedence() {
            let check = source.check(media).await;
            let Some(record) = check.record else {
                debug!(media = %media, source = %kind, "Inconclusive, trying next source");
                continue;
            };

            let verdict = match kind {
                SourceKind::Db | SourceKind::Api => {
                    let status = if check.available {
                        CanonicalStatus::Available
                    } else {
                        CanonicalStatus::Unknown
                    };
                    Verdict::new(status, kind.as_str())
                }
                SourceKind::Catalog => match catalog::interpret(&record, &media.requested_seasons()) {
                    Some(reading) => Verdict::new(reading.status, format!("catalog:{}", reading.path)),
                    None => Verdict::fallback(),
                },
            };

            info!(
                operation = "resolve",
                media = %media,
                status = %verdict.status,
                source = %verdict.source,
                "Resolved availability"
            );
            return verdict;
        }

        debug!(media = %media, "No source was conclusive");
        Verdict::fallback()
    }
}
