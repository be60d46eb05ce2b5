//! Record producer: one feed fetch -> one telemetry record.
//!
//! A fetch either yields a live record or, when the dish cannot be reached
//! (or answers without an identifier), a fallback record that keeps the
//! status family reporting `NO_CONNECTION_WITH_DISH` for the last known
//! device.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

use crate::feed::{FeedItem, PollStatus, TelemetryFeed};
use crate::identity::DeviceIdentity;
use crate::record::TelemetryRecord;
use crate::value::Classifier;

/// Drives the telemetry feed and assembles records.
pub struct RecordProducer {
    feed: Box<dyn TelemetryFeed>,
    classifier: Classifier,
    identity: Arc<DeviceIdentity>,
}

impl RecordProducer {
    pub fn new(
        feed: Box<dyn TelemetryFeed>,
        classifier: Classifier,
        identity: Arc<DeviceIdentity>,
    ) -> Self {
        Self {
            feed,
            classifier,
            identity,
        }
    }

    pub fn feed_name(&self) -> &str {
        self.feed.name()
    }

    /// Run one fetch. With `shutdown` set the feed is asked to flush.
    ///
    /// Always returns exactly one record. The status is `Ok` only when a live
    /// record was produced.
    pub fn produce(&mut self, shutdown: bool) -> (TelemetryRecord, PollStatus) {
        let poll = self.feed.fetch(shutdown);

        let status = match poll.status {
            PollStatus::Ok => {
                let mut fields = BTreeMap::new();
                for item in poll.items {
                    match item {
                        FeedItem::Scalar {
                            name,
                            value,
                            category,
                        } => {
                            let fv = self.classifier.classify(&name, value, &category);
                            log::trace!("{name} = {} ({category})", fv.value);
                            fields.insert(name, fv);
                        }
                        FeedItem::Sequence { name, values, .. } => {
                            log::trace!("ignoring sequence {name} ({} values)", values.len());
                        }
                    }
                }
                let timestamp = poll.timestamp.unwrap_or_else(SystemTime::now);
                match TelemetryRecord::live(fields, timestamp) {
                    Some(record) => {
                        self.identity.observe(record.device_id());
                        log::debug!(
                            "poll ok: {} fields from {}",
                            record.fields().len(),
                            record.device_id()
                        );
                        return (record, PollStatus::Ok);
                    }
                    None => PollStatus::Unavailable(format!(
                        "{} answered without a device identifier",
                        self.feed.name()
                    )),
                }
            }
            failed => failed,
        };

        let device_id = self.identity.get();
        log::warn!("poll failed ({status}), reporting {device_id} as disconnected");
        (TelemetryRecord::fallback(device_id, SystemTime::now()), status)
    }

    /// Release the feed. Consumes the producer.
    pub fn release(mut self) {
        log::debug!("releasing feed {}", self.feed.name());
        self.feed.shutdown();
    }
}
