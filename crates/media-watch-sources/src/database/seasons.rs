use serde_json::Value;

fn stat(season: &Value, field: &str) -> i64 {
    season
        .get("statistics")
        .and_then(|s| s.get(field))
        .and_then(|v| v.as_f64())
        .map(|v| v as i64)
        .unwrap_or(0)
}

/// Availability from a series row's `seasons` column.
///
/// With a requested season, that season needs every episode on disk (and at
/// least one episode). Without one, any season with files counts.
pub fn season_files_available(seasons: &[Value], season: Option<u32>) -> bool {
    match season {
        Some(number) => seasons
            .iter()
            .find(|s| s.get("seasonNumber").and_then(Value::as_u64) == Some(u64::from(number)))
            .map(|s| {
                let files = stat(s, "episodeFileCount");
                let total = stat(s, "totalEpisodeCount");
                let percent = stat(s, "percentOfEpisodes");
                (percent == 100 || files >= total) && files > 0
            })
            .unwrap_or(false),
        None => seasons.iter().any(|s| stat(s, "episodeFileCount") > 0),
    }
}
