use async_trait::async_trait;
use media_watch_models::MediaRef;
use serde_json::Value;
use tracing::{debug, warn};
use crate::error::SourceError;

/// Answer from one source: whether the item is playable, and the raw record
/// the source holds for it. `record == None` means the item is unknown to the
/// source, which is different from "known but not available".
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCheck {
    pub available: bool,
    pub record: Option<Value>,
}

impl SourceCheck {
    pub fn found(available: bool, record: Value) -> Self {
        Self {
            available,
            record: Some(record),
        }
    }

    /// Nothing known: unconfigured, unreachable, or not tracked by the source.
    pub fn unknown() -> Self {
        Self {
            available: false,
            record: None,
        }
    }

    pub fn is_conclusive(&self) -> bool {
        self.record.is_some()
    }
}

#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    fn source_name(&self) -> &str;

    /// Query the backing system. Errors are reported here and swallowed by `check`.
    async fn lookup(&self, media: &MediaRef) -> Result<SourceCheck, SourceError>;

    /// Never fails: every error degrades to `SourceCheck::unknown()`.
    async fn check(&self, media: &MediaRef) -> SourceCheck {
        match self.lookup(media).await {
            Ok(check) => check,
            Err(e) if e.is_not_found() => {
                debug!(source = self.source_name(), media = %media, "Item not known to source");
                SourceCheck::unknown()
            }
            Err(e) => {
                warn!(
                    operation = "source_check",
                    source = self.source_name(),
                    media = %media,
                    error = %e,
                    "Source check failed, treating as inconclusive"
                );
                SourceCheck::unknown()
            }
        }
    }

    /// Connectivity check used by `config check`.
    async fn probe(&self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Sources that can also withdraw an upstream request expose it here.
    fn as_retractor(&self) -> Option<&dyn RequestRetractor> {
        None
    }
}

/// Withdraws a request previously submitted to the request-management service.
#[async_trait]
pub trait RequestRetractor: Send + Sync {
    async fn retract_request(&self, request_id: u64) -> Result<(), SourceError>;
}
