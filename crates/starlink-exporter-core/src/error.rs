//! Error type for fatal exporter conditions.
//!
//! A feed that cannot be reached during a poll is *not* an error here: that is
//! reported as [`PollStatus`](crate::feed::PollStatus) and turned into a
//! fallback record. These variants cover setup failures that should stop the
//! process.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Telemetry feed unavailable: {0}")]
    FeedInit(String),
}

impl Error {
    pub(crate) fn feed_init<S: Into<String>>(msg: S) -> Self {
        Error::FeedInit(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
