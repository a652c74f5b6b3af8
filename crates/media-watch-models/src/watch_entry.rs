use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::media::{MediaKey, MediaRef};
use crate::verdict::Verdict;

/// Tracking marker persisted with each entry between sweeps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WatchMarker {
    /// Submitted, never swept.
    #[default]
    Pending,
    /// Swept at least once, not yet available.
    Checking,
    /// A notification was committed for this entry; it must not be sent again.
    Notified,
}

/// A tracked request submitted by the chat layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchRequest {
    pub media: MediaRef,
    pub requester_channel: String,
    pub display_title: String,
    pub library_label: String,
    /// Upstream request id, retracted on cancel when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchEntry {
    #[serde(rename = "media_ref")]
    pub media: MediaRef,
    pub requester_channel: String,
    pub display_title: String,
    pub library_label: String,
    #[serde(default)]
    pub last_known_status: WatchMarker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verdict: Option<Verdict>,
}

impl WatchEntry {
    pub fn from_request(request: WatchRequest, added_at: DateTime<Utc>) -> Self {
        Self {
            media: request.media,
            requester_channel: request.requester_channel,
            display_title: request.display_title,
            library_label: request.library_label,
            last_known_status: WatchMarker::Pending,
            confirmation_handle: None,
            request_id: request.request_id,
            added_at,
            last_checked_at: None,
            last_verdict: None,
        }
    }

    /// Whether this entry is the one tracked for `media` on `channel`.
    pub fn matches(&self, media: &MediaKey, channel: &str) -> bool {
        self.media.key() == *media && self.requester_channel == channel
    }

    pub fn already_notified(&self) -> bool {
        self.last_known_status == WatchMarker::Notified
    }
}
