pub mod automation;
pub mod catalog;
pub mod database;
pub mod error;
pub mod factory;
pub mod http;
pub mod retry;
pub mod set;
pub mod traits;

#[cfg(test)]
mod testing;

pub use error::SourceError;
pub use factory::{SourceFactory, SourceFactoryRegistry};
pub use retry::{with_retry, RetryPolicy};
pub use set::{SourceKind, SourceSet};
pub use traits::{AvailabilitySource, RequestRetractor, SourceCheck};
