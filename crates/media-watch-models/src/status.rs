use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Canonical availability status shared by every source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalStatus {
    Available,
    PartiallyAvailable,
    Processing,
    Pending,
    Declined,
    Unknown,
}

impl CanonicalStatus {
    /// Statuses that owe the requester a notification.
    pub fn is_notify_worthy(&self) -> bool {
        matches!(self, CanonicalStatus::Available | CanonicalStatus::PartiallyAvailable)
    }

    pub fn is_unknown(&self) -> bool {
        *self == CanonicalStatus::Unknown
    }

    /// Catalog media-status codes: 1 pending, 2 processing, 3 partial, 4 available.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => CanonicalStatus::Pending,
            2 => CanonicalStatus::Processing,
            3 => CanonicalStatus::PartiallyAvailable,
            4 => CanonicalStatus::Available,
            _ => CanonicalStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Available => "AVAILABLE",
            CanonicalStatus::PartiallyAvailable => "PARTIALLY_AVAILABLE",
            CanonicalStatus::Processing => "PROCESSING",
            CanonicalStatus::Pending => "PENDING",
            CanonicalStatus::Declined => "DECLINED",
            CanonicalStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status value exactly as one source returned it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawStatus {
    Absent,
    Bool(bool),
    Code(i64),
    Text(String),
}

impl RawStatus {
    /// Classify a JSON field. Objects, arrays and fractional numbers carry no
    /// status and come back as `Absent`.
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => RawStatus::Absent,
            Some(Value::Bool(b)) => RawStatus::Bool(*b),
            Some(Value::Number(n)) => {
                if let Some(code) = n.as_i64() {
                    RawStatus::Code(code)
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => RawStatus::Code(f as i64),
                        _ => RawStatus::Absent,
                    }
                }
            }
            Some(Value::String(s)) => RawStatus::Text(s.clone()),
            Some(Value::Array(_)) | Some(Value::Object(_)) => RawStatus::Absent,
        }
    }
}

impl From<bool> for RawStatus {
    fn from(value: bool) -> Self {
        RawStatus::Bool(value)
    }
}

impl From<i64> for RawStatus {
    fn from(value: i64) -> Self {
        RawStatus::Code(value)
    }
}

impl From<&str> for RawStatus {
    fn from(value: &str) -> Self {
        RawStatus::Text(value.to_string())
    }
}

impl<T: Into<RawStatus>> From<Option<T>> for RawStatus {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawStatus::Absent)
    }
}

const AVAILABLE_SYNONYMS: &[&str] = &["READY", "COMPLETE", "COMPLETED", "DONE"];

// Show lifecycle words say nothing about whether files exist.
const LIFECYCLE_WORDS: &[&str] = &[
    "RETURNING SERIES",
    "ENDED",
    "CANCELED",
    "CANCELLED",
    "IN PRODUCTION",
    "PLANNED",
    "PILOT",
];

/// Map any raw status into the canonical enumeration. Never fails.
///
/// A `false` flag maps to `Unknown`, not to "missing": a negative flag is not
/// evidence of absence.
pub fn normalize(raw: &RawStatus) -> CanonicalStatus {
    match raw {
        RawStatus::Absent => CanonicalStatus::Unknown,
        RawStatus::Bool(true) => CanonicalStatus::Available,
        RawStatus::Bool(false) => CanonicalStatus::Unknown,
        RawStatus::Code(code) => CanonicalStatus::from_code(*code),
        RawStatus::Text(text) => normalize_text(text),
    }
}

fn normalize_text(text: &str) -> CanonicalStatus {
    let v = text.trim().to_uppercase();

    match v.as_str() {
        "AVAILABLE" => return CanonicalStatus::Available,
        "PARTIALLY_AVAILABLE" => return CanonicalStatus::PartiallyAvailable,
        "PROCESSING" => return CanonicalStatus::Processing,
        "PENDING" => return CanonicalStatus::Pending,
        "DECLINED" => return CanonicalStatus::Declined,
        "UNKNOWN" => return CanonicalStatus::Unknown,
        _ => {}
    }

    if AVAILABLE_SYNONYMS.contains(&v.as_str()) {
        return CanonicalStatus::Available;
    }
    if LIFECYCLE_WORDS.contains(&v.as_str()) {
        return CanonicalStatus::Unknown;
    }

    if v.contains("PARTIAL") {
        CanonicalStatus::PartiallyAvailable
    } else if v.contains("PENDING") {
        CanonicalStatus::Pending
    } else if v.contains("PROCESS") {
        CanonicalStatus::Processing
    } else if v.contains("DECLIN") || v.contains("DENIED") {
        CanonicalStatus::Declined
    } else {
        CanonicalStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_codes() {
        assert_eq!(normalize(&RawStatus::Code(1)), CanonicalStatus::Pending);
        assert_eq!(normalize(&RawStatus::Code(2)), CanonicalStatus::Processing);
        assert_eq!(normalize(&RawStatus::Code(3)), CanonicalStatus::PartiallyAvailable);
        assert_eq!(normalize(&RawStatus::Code(4)), CanonicalStatus::Available);
        for code in [-1, 0, 5, 6, 42, i64::MAX] {
            assert_eq!(normalize(&RawStatus::Code(code)), CanonicalStatus::Unknown);
        }
    }

    #[test]
    fn test_booleans() {
        assert_eq!(normalize(&RawStatus::Bool(true)), CanonicalStatus::Available);
        assert_eq!(normalize(&RawStatus::Bool(false)), CanonicalStatus::Unknown);
        assert_eq!(normalize(&RawStatus::Absent), CanonicalStatus::Unknown);
    }

    #[test]
    fn test_partial_anywhere_in_text() {
        for text in ["partial", "Partially Available", "  season partially ready", "xxPARTIALxx", "PENDING_PARTIAL"] {
            assert_eq!(normalize(&RawStatus::from(text)), CanonicalStatus::PartiallyAvailable, "{}", text);
        }
    }

    #[test]
    fn test_text_members_and_synonyms() {
        assert_eq!(normalize(&"available".into()), CanonicalStatus::Available);
        assert_eq!(normalize(&"Ready".into()), CanonicalStatus::Available);
        assert_eq!(normalize(&"completed".into()), CanonicalStatus::Available);
        assert_eq!(normalize(&"DONE".into()), CanonicalStatus::Available);
        assert_eq!(normalize(&"declined".into()), CanonicalStatus::Declined);
        assert_eq!(normalize(&"request denied".into()), CanonicalStatus::Declined);
        assert_eq!(normalize(&"pending approval".into()), CanonicalStatus::Pending);
        assert_eq!(normalize(&"processing".into()), CanonicalStatus::Processing);
        assert_eq!(normalize(&"Unavailable".into()), CanonicalStatus::Unknown);
    }

    #[test]
    fn test_lifecycle_words_are_not_availability() {
        for text in ["Returning Series", "Ended", "Canceled", "Cancelled", "In Production"] {
            assert_eq!(normalize(&RawStatus::from(text)), CanonicalStatus::Unknown, "{}", text);
        }
    }

    #[test]
    fn test_from_json() {
        assert_eq!(RawStatus::from_json(None), RawStatus::Absent);
        assert_eq!(RawStatus::from_json(Some(&json!(null))), RawStatus::Absent);
        assert_eq!(RawStatus::from_json(Some(&json!(4))), RawStatus::Code(4));
        assert_eq!(RawStatus::from_json(Some(&json!(3.0))), RawStatus::Code(3));
        assert_eq!(RawStatus::from_json(Some(&json!(3.5))), RawStatus::Absent);
        assert_eq!(RawStatus::from_json(Some(&json!(true))), RawStatus::Bool(true));
        assert_eq!(RawStatus::from_json(Some(&json!({"status": 4}))), RawStatus::Absent);
        assert_eq!(RawStatus::from_json(Some(&json!("READY"))), RawStatus::Text("READY".to_string()));
    }

    #[test]
    fn test_notify_worthy() {
        assert!(CanonicalStatus::Available.is_notify_worthy());
        assert!(CanonicalStatus::PartiallyAvailable.is_notify_worthy());
        assert!(!CanonicalStatus::Processing.is_notify_worthy());
        assert!(!CanonicalStatus::Declined.is_notify_worthy());
        assert!(!CanonicalStatus::Unknown.is_notify_worthy());
    }
}
