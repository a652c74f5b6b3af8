use serde::{Deserialize, Serialize};
use std::fmt;
use crate::status::CanonicalStatus;

/// Outcome of one resolution: a canonical status and the path that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub status: CanonicalStatus,
    pub source: String,
}

impl Verdict {
    pub fn new(status: CanonicalStatus, source: impl Into<String>) -> Self {
        Self {
            status,
            source: source.into(),
        }
    }

    /// Nothing conclusive from any source.
    pub fn fallback() -> Self {
        Self::new(CanonicalStatus::Unknown, "fallback")
    }

    pub fn is_notify_worthy(&self) -> bool {
        self.status.is_notify_worthy()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (via {})", self.status, self.source)
    }
}
