use serde::{Deserialize, Serialize};
use crate::media::MediaRef;
use crate::status::CanonicalStatus;
use crate::watch_entry::WatchEntry;

/// Emitted once when a tracked item reaches a notify-worthy status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEvent {
    pub requester_channel: String,
    pub display_title: String,
    pub library_label: String,
    /// Outstanding acknowledgement message to delete once this fires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_handle: Option<String>,
    pub media: MediaRef,
    pub status: CanonicalStatus,
}

impl NotificationEvent {
    pub fn from_entry(entry: &WatchEntry, status: CanonicalStatus) -> Self {
        Self {
            requester_channel: entry.requester_channel.clone(),
            display_title: entry.display_title.clone(),
            library_label: entry.library_label.clone(),
            confirmation_handle: entry.confirmation_handle.clone(),
            media: entry.media.clone(),
            status,
        }
    }

    pub fn message(&self) -> String {
        format!(
            "🎉 \"{}\" is now available in the {} library. Enjoy!",
            self.display_title, self.library_label
        )
    }
}
