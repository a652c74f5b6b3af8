//! Interpretation of a catalog-service media record.
//!
//! The catalog aggregates the automation services, so its records carry
//! availability in several places. They are consulted in a fixed order and
//! the first non-UNKNOWN reading wins.

use media_watch_models::{normalize, CanonicalStatus, RawStatus};
use serde_json::Value;

/// Direct status/availability fields, checked in order.
const DIRECT_FIELDS: &[(&str, &str)] = &[
    ("mediaInfo.status", "/mediaInfo/status"),
    ("media.status", "/media/status"),
    ("status", "/status"),
    ("mediaInfo.available", "/mediaInfo/available"),
    ("media.available", "/media/available"),
    ("mediaInfo.isAvailable", "/mediaInfo/isAvailable"),
    ("media.isAvailable", "/media/isAvailable"),
];

const SEASON_CONTAINERS: &[&str] = &["/mediaInfo/seasons", "/media/seasons", "/seasons"];

/// Ids linking the item to a playback library; presence means it is there.
const LIBRARY_IDS: &[&str] = &["plexId", "ratingKey", "jellyfinId", "tautulliId"];

/// Reading of one record: the status and the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogReading {
    pub status: CanonicalStatus,
    pub path: String,
}

impl CatalogReading {
    fn new(status: CanonicalStatus, path: impl Into<String>) -> Self {
        Self {
            status,
            path: path.into(),
        }
    }
}

/// Interpret `record` for the given requested seasons (empty = whole item).
/// Returns None when nothing in the record says anything about availability.
pub fn interpret(record: &Value, requested_seasons: &[u32]) -> Option<CatalogReading> {
    direct_status(record)
        .or_else(|| season_status(record, requested_seasons))
        .or_else(|| library_link(record))
}

fn direct_status(record: &Value) -> Option<CatalogReading> {
    DIRECT_FIELDS.iter().find_map(|(path, pointer)| {
        let status = normalize(&RawStatus::from_json(record.pointer(pointer)));
        (!status.is_unknown()).then(|| CatalogReading::new(status, *path))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeasonReadiness {
    Full,
    Started,
    Empty,
}

fn count(season: &Value, field: &str, default: i64) -> i64 {
    season
        .get(field)
        .and_then(Value::as_f64)
        .map(|v| v as i64)
        .unwrap_or(default)
}

fn readiness(season: &Value) -> SeasonReadiness {
    let flagged_available = match season.get("status") {
        Some(Value::Number(n)) => n.as_i64() == Some(4),
        Some(Value::String(s)) => s.eq_ignore_ascii_case("AVAILABLE"),
        _ => false,
    };

    let available = count(season, "episodesAvailable", 0);
    let total = count(season, "episodeCount", 1);

    if flagged_available || available >= total {
        SeasonReadiness::Full
    } else if available > 0 {
        SeasonReadiness::Started
    } else {
        SeasonReadiness::Empty
    }
}

fn seasons(record: &Value) -> Option<&Vec<Value>> {
    SEASON_CONTAINERS
        .iter()
        .find_map(|pointer| record.pointer(pointer).and_then(Value::as_array))
        .filter(|seasons| !seasons.is_empty())
}

fn season_number(season: &Value) -> Option<u64> {
    season.get("seasonNumber").and_then(Value::as_u64)
}

fn season_status(record: &Value, requested: &[u32]) -> Option<CatalogReading> {
    let seasons = seasons(record)?;

    let (considered, prefix): (Vec<SeasonReadiness>, &str) = if requested.is_empty() {
        (seasons.iter().map(readiness).collect(), "seasons.all")
    } else {
        let considered = requested
            .iter()
            .map(|number| {
                seasons
                    .iter()
                    .find(|s| season_number(s) == Some(u64::from(*number)))
                    .map(readiness)
                    .unwrap_or(SeasonReadiness::Empty)
            })
            .collect();
        (considered, "seasons.requested")
    };

    if considered.iter().all(|r| *r == SeasonReadiness::Full) {
        Some(CatalogReading::new(CanonicalStatus::Available, format!("{}_full", prefix)))
    } else if considered.iter().any(|r| *r != SeasonReadiness::Empty) {
        Some(CatalogReading::new(CanonicalStatus::PartiallyAvailable, format!("{}_partial", prefix)))
    } else {
        None
    }
}

fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(_) => true,
    }
}

fn library_link(record: &Value) -> Option<CatalogReading> {
    LIBRARY_IDS.iter().find_map(|key| {
        let linked = ["mediaInfo", "media"]
            .iter()
            .any(|parent| is_set(record.get(*parent).and_then(|p| p.get(*key))));
        linked.then(|| CatalogReading::new(CanonicalStatus::Available, format!("id:{}", key)))
    })
}
