//! Thread-safe FIFO buffer between the poll loop and scrapes.
//!
//! The poll loop pushes one record per cycle; each scrape drains everything
//! at once. A drain is an atomic snapshot: a concurrent push lands either in
//! it or, whole, in the next one.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::record::TelemetryRecord;

/// FIFO of pending records. Unbounded unless built with [`SampleQueue::bounded`].
#[derive(Debug, Default)]
pub struct SampleQueue {
    records: Mutex<VecDeque<TelemetryRecord>>,
    cap: Option<usize>,
}

impl SampleQueue {
    /// Create an unbounded queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue that keeps at most `cap` records, dropping the oldest.
    /// A cap of 0 means unbounded.
    pub fn bounded(cap: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::new()),
            cap: (cap > 0).then_some(cap),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TelemetryRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a record.
    pub fn push(&self, record: TelemetryRecord) {
        let mut records = self.lock();
        if let Some(cap) = self.cap {
            while records.len() >= cap {
                if let Some(dropped) = records.pop_front() {
                    log::warn!(
                        "sample queue full ({cap}), dropping record for {} from {}ms",
                        dropped.device_id(),
                        dropped.timestamp_ms()
                    );
                }
            }
        }
        records.push_back(record);
    }

    /// Remove and return every queued record, oldest first.
    pub fn drain_all(&self) -> Vec<TelemetryRecord> {
        let drained = std::mem::take(&mut *self.lock());
        drained.into()
    }

    /// Number of records waiting.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity_limit(&self) -> Option<usize> {
        self.cap
    }
}
