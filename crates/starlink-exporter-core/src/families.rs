//! Metric family construction.
//!
//! Pure helpers that turn label sets, values and timestamps into
//! `prometheus::proto::MetricFamily` values for the text encoder. Every family
//! is a gauge; the info and status families are gauges with a fixed meaning.

use std::collections::BTreeMap;

use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};

/// Prefix of every exported family.
pub const METRIC_PREFIX: &str = "starlink";

/// Label carrying the device identifier.
pub const DEVICE_LABEL: &str = "id";

/// Family name for the info aggregate.
pub fn info_family_name() -> String {
    format!("{METRIC_PREFIX}_info")
}

/// Family name for the connection state.
pub fn status_family_name() -> String {
    format!("{METRIC_PREFIX}_status")
}

/// Family name for a numeric field.
pub fn gauge_family_name(field: &str) -> String {
    format!("{METRIC_PREFIX}_{}", sanitize_name(field))
}

/// Replace characters that are not valid in a metric or label name.
pub fn sanitize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// One sample: labels (in order), value, timestamp in ms since the epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSample {
    pub labels: Vec<(String, String)>,
    pub value: f64,
    pub timestamp_ms: i64,
}

impl GaugeSample {
    /// A sample labelled only with the device id.
    pub fn for_device(device_id: &str, value: f64, timestamp_ms: i64) -> Self {
        Self {
            labels: vec![(DEVICE_LABEL.to_string(), device_id.to_string())],
            value,
            timestamp_ms,
        }
    }
}

/// Accumulates samples for one family, one sample per device.
#[derive(Debug, Clone)]
pub struct FamilyBuilder {
    name: String,
    help: String,
    // keyed by device id: a later sample for the same device replaces the earlier one
    samples: BTreeMap<String, GaugeSample>,
}

impl FamilyBuilder {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            samples: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&mut self, device_id: &str, sample: GaugeSample) {
        self.samples.insert(device_id.to_string(), sample);
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn build(self) -> MetricFamily {
        gauge_family(
            &self.name,
            &self.help,
            self.samples.into_values().collect(),
        )
    }
}

/// Build a gauge family from samples.
pub fn gauge_family(name: &str, help: &str, samples: Vec<GaugeSample>) -> MetricFamily {
    let mut family = MetricFamily::default();
    family.set_name(name.to_string());
    family.set_help(help.to_string());
    family.set_field_type(MetricType::GAUGE);
    for sample in samples {
        family.mut_metric().push(gauge_metric(sample));
    }
    family
}

fn gauge_metric(sample: GaugeSample) -> Metric {
    let mut metric = Metric::default();
    for (name, value) in sample.labels {
        let mut pair = LabelPair::default();
        pair.set_name(name);
        pair.set_value(value);
        metric.mut_label().push(pair);
    }
    let mut gauge = Gauge::default();
    gauge.set_value(sample.value);
    metric.set_gauge(gauge);
    if sample.timestamp_ms != 0 {
        metric.set_timestamp_ms(sample.timestamp_ms);
    }
    metric
}
