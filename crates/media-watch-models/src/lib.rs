pub mod media;
pub mod notification;
pub mod status;
pub mod verdict;
pub mod watch_entry;

pub use media::{MediaKey, MediaRef, MediaType};
pub use notification::NotificationEvent;
pub use status::{normalize, CanonicalStatus, RawStatus};
pub use verdict::Verdict;
pub use watch_entry::{WatchEntry, WatchMarker, WatchRequest};
