//! Telemetry feed contract.
//!
//! A feed is polled once per cycle and hands back a finite list of
//! [`FeedItem`]s together with a [`PollStatus`] and the time the sample was
//! taken. Implementations may block on the network; they are only ever called
//! from the poll loop.

use std::fmt;
use std::time::SystemTime;

use crate::value::RawValue;

/// Outcome of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus {
    /// Fields were delivered for this cycle.
    Ok,
    /// The device could not be reached or its answer was unusable.
    Unavailable(String),
}

impl PollStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Process exit code for a run that ended with this status.
    pub fn code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Unavailable(_) => 1,
        }
    }
}

impl fmt::Display for PollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Unavailable(reason) => write!(f, "unavailable: {reason}"),
        }
    }
}

/// One named value from the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    /// Instantaneous value.
    Scalar {
        name: String,
        value: RawValue,
        category: String,
    },
    /// Sequence-shaped value (per-wedge or per-sample series).
    Sequence {
        name: String,
        values: Vec<RawValue>,
        category: String,
        start: u64,
    },
}

impl FeedItem {
    pub fn scalar(name: impl Into<String>, value: impl Into<RawValue>, category: &str) -> Self {
        Self::Scalar {
            name: name.into(),
            value: value.into(),
            category: category.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Scalar { name, .. } | Self::Sequence { name, .. } => name,
        }
    }
}

/// Result of one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPoll {
    pub status: PollStatus,
    /// When the sample was taken; `None` if the feed could not say.
    pub timestamp: Option<SystemTime>,
    pub items: Vec<FeedItem>,
}

impl FeedPoll {
    pub fn ok(timestamp: SystemTime, items: Vec<FeedItem>) -> Self {
        Self {
            status: PollStatus::Ok,
            timestamp: Some(timestamp),
            items,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            status: PollStatus::Unavailable(reason.into()),
            timestamp: None,
            items: Vec::new(),
        }
    }
}

/// Trait that every telemetry feed must implement.
pub trait TelemetryFeed: Send {
    /// Short name for log lines.
    fn name(&self) -> &str;

    /// Fetch one sample. With `flush` set, the feed should also emit any
    /// state it buffers internally, since no further fetch will follow.
    fn fetch(&mut self, flush: bool) -> FeedPoll;

    /// Release held resources. Called once, after the final fetch.
    fn shutdown(&mut self) {}
}
