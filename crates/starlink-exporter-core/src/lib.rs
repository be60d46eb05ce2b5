//! # starlink-exporter-core
//!
//! Polls a Starlink dish for status and history telemetry and turns it into
//! Prometheus metric families on demand.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::{Arc, mpsc};
//! use starlink_exporter_core::{
//!     Classifier, DeviceIdentity, DishFeed, DishOptions, Mode, PollLoop, RecordProducer,
//!     SampleQueue, TelemetryCollector,
//! };
//!
//! let options = DishOptions {
//!     modes: [Mode::Status, Mode::Usage].into_iter().collect(),
//!     ..DishOptions::default()
//! };
//! let feed = DishFeed::grpcurl("grpcurl", "192.168.100.1:9200", options).unwrap();
//! let queue = Arc::new(SampleQueue::new());
//! let identity = Arc::new(DeviceIdentity::new());
//! let producer = RecordProducer::new(Box::new(feed), Classifier::default(), identity.clone());
//! let collector = TelemetryCollector::new(queue.clone(), identity);
//!
//! let registry = prometheus::Registry::new();
//! registry.register(Box::new(collector)).unwrap();
//!
//! let (_stop, shutdown) = mpsc::channel();
//! let status = PollLoop::with_interval_secs(producer, queue, 0.0).run(&shutdown);
//! println!("poll: {status}, families: {}", registry.gather().len());
//! ```
//!
//! ## Architecture
//!
//! Feed -> Producer -> SampleQueue -> Collector -> MetricFamily
//!
//! The poll loop runs on its own thread and pushes one record per tick. The
//! collector runs on the scrape path: it drains everything queued since the
//! previous scrape, so each record is exported exactly once. When the dish is
//! unreachable the producer still emits a record, keeping `starlink_status`
//! at `NO_CONNECTION_WITH_DISH` for the last known device.

pub mod collector;
pub mod descriptions;
pub mod dish;
pub mod driver;
pub mod error;
pub mod families;
pub mod feed;
pub mod history;
pub mod identity;
pub mod modes;
pub mod producer;
pub mod queue;
pub mod record;
pub mod state;
pub mod value;

#[cfg(test)]
mod test_support;

pub use collector::{IGNORED_FIELD, TelemetryCollector};
pub use descriptions::FieldDescriptions;
pub use dish::{DEFAULT_TARGET, DishFeed, DishOptions, status_items};
pub use driver::{LoopPhase, PollLoop};
pub use error::{Error, Result};
pub use families::{FamilyBuilder, GaugeSample, METRIC_PREFIX, gauge_family};
pub use feed::{FeedItem, FeedPoll, PollStatus, TelemetryFeed};
pub use history::{HistoryReport, HistorySample, HistorySnapshot, HistoryWindow};
pub use identity::DeviceIdentity;
pub use modes::{Mode, ModeSet};
pub use producer::RecordProducer;
pub use queue::SampleQueue;
pub use record::{RecordKind, TelemetryRecord, UNKNOWN_DEVICE};
pub use state::{NO_CONNECTION, STATE_VOCABULARY, state_code, state_name};
pub use value::{Classifier, FieldValue, MetricValue, RawValue};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
