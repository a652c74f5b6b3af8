use thiserror::Error;

/// Why a source could not give a conclusive answer.
///
/// None of these are fatal: the resolver treats every variant as "skip this
/// source".
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SourceError {
    /// Failures worth retrying with backoff: connection trouble, timeouts,
    /// rate limiting and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(e) => e.is_timeout() || e.is_connect(),
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            SourceError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed
            ),
            SourceError::SourceUnavailable(_)
            | SourceError::RecordNotFound(_)
            | SourceError::MalformedRecord(_) => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::RecordNotFound(_))
    }
}
