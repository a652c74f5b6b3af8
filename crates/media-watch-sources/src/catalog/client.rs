use async_trait::async_trait;
use media_watch_models::{normalize, MediaRef, RawStatus};
use serde_json::Value;
use tracing::{debug, info};
use crate::error::SourceError;
use crate::http::ApiClient;
use crate::traits::{AvailabilitySource, RequestRetractor, SourceCheck};

/// The request-management service (Overseerr-style API).
///
/// Its records are richer than a yes/no answer; the resolver interprets the
/// full record, so `lookup` always returns it when the item is known.
pub struct CatalogSource {
    client: ApiClient,
}

impl CatalogSource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AvailabilitySource for CatalogSource {
    fn source_name(&self) -> &str {
        "catalog"
    }

    async fn lookup(&self, media: &MediaRef) -> Result<SourceCheck, SourceError> {
        let path = format!("{}/{}", media.media_type, media.catalog_id);
        let record: Value = self.client.get_json(&path, &[]).await?;
        if !record.is_object() {
            return Err(SourceError::MalformedRecord(format!("{} is not an object", path)));
        }

        let status = normalize(&RawStatus::from_json(record.pointer("/mediaInfo/status")));
        debug!(media = %media, status = %status, "Catalog record fetched");
        Ok(SourceCheck::found(status.is_notify_worthy(), record))
    }

    async fn probe(&self) -> Result<(), SourceError> {
        let _: Value = self.client.get_json("status", &[]).await?;
        Ok(())
    }

    fn as_retractor(&self) -> Option<&dyn RequestRetractor> {
        Some(self)
    }
}

/// The show's TVDB id from a catalog details record, if it carries one.
pub fn tvdb_id_from_details(record: &Value) -> Option<u32> {
    let ids = record.get("externalIds").or_else(|| record.get("external_ids"))?;
    let id = ids.get("tvdbId").or_else(|| ids.get("tvdb_id"))?;
    match id {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id > 0)
}

#[async_trait]
impl RequestRetractor for CatalogSource {
    async fn retract_request(&self, request_id: u64) -> Result<(), SourceError> {
        self.client.delete(&format!("request/{}", request_id)).await?;
        info!(request_id, "Upstream request withdrawn");
        Ok(())
    }
}
