//! Telemetry records: one per poll, live or fallback.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::state::NO_CONNECTION;
use crate::value::{FieldValue, MetricValue, STATE_FIELD};

/// Field carrying the device identifier.
pub const ID_FIELD: &str = "id";

/// Sentinel identifier used before any device has been seen.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// How a record came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Built from a successful fetch.
    Live,
    /// Synthesized because the fetch failed or had no identifier.
    Fallback,
}

/// One sample of device telemetry.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    device_id: String,
    timestamp: SystemTime,
    fields: BTreeMap<String, FieldValue>,
    kind: RecordKind,
}

impl TelemetryRecord {
    /// A record from a successful fetch. The identifier is taken from the
    /// text `id` field; returns `None` when there is none.
    pub fn live(fields: BTreeMap<String, FieldValue>, timestamp: SystemTime) -> Option<Self> {
        let device_id = fields
            .get(ID_FIELD)
            .and_then(|f| f.value.as_text())
            .filter(|id| !id.is_empty())?
            .to_string();
        Some(Self {
            device_id,
            timestamp,
            fields,
            kind: RecordKind::Live,
        })
    }

    /// A "disconnected" record for `device_id` at `timestamp`.
    pub fn fallback(device_id: impl Into<String>, timestamp: SystemTime) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(
            STATE_FIELD.to_string(),
            FieldValue {
                value: MetricValue::State(NO_CONNECTION.to_string()),
                description: STATE_FIELD.to_string(),
                category: "status".to_string(),
            },
        );
        Self {
            device_id: device_id.into(),
            timestamp,
            fields,
            kind: RecordKind::Fallback,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Milliseconds since the Unix epoch, as used by the exposition format.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// The state name, if the record carries one.
    pub fn state(&self) -> Option<&str> {
        self.fields.get(STATE_FIELD).and_then(|f| f.value.as_text())
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.kind == RecordKind::Live
    }

    /// JSON view for the `check` command.
    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(name, fv)| {
                let value = match &fv.value {
                    MetricValue::Number(v) => serde_json::json!(v),
                    MetricValue::Text(s) | MetricValue::State(s) => serde_json::json!(s),
                };
                (name.clone(), value)
            })
            .collect();
        serde_json::json!({
            "device_id": self.device_id,
            "timestamp_ms": self.timestamp_ms(),
            "kind": self.kind,
            "fields": fields,
        })
    }
}
