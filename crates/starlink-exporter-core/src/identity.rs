//! Last-known device identifier, shared by the producer and the collector.

use std::sync::{Mutex, PoisonError};

use crate::record::UNKNOWN_DEVICE;

/// Holds the most recent identifier seen on a live record.
///
/// Starts as `"unknown"` and is never reset; fallback records are attributed
/// to whatever this holds.
#[derive(Debug)]
pub struct DeviceIdentity {
    last: Mutex<String>,
}

impl DeviceIdentity {
    pub fn new() -> Self {
        Self {
            last: Mutex::new(UNKNOWN_DEVICE.to_string()),
        }
    }

    /// Current identifier.
    pub fn get(&self) -> String {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record `id` as the latest seen. Empty ids are ignored.
    pub fn observe(&self, id: &str) {
        if id.is_empty() {
            return;
        }
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if *last != id {
            log::info!("device identifier is now {id} (was {last})");
            *last = id.to_string();
        }
    }

    /// Whether any device has been observed yet.
    pub fn is_known(&self) -> bool {
        self.get() != UNKNOWN_DEVICE
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self::new()
    }
}
