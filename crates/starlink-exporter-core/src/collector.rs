//! Scrape-time collector.
//!
//! Each scrape drains the [`SampleQueue`] and folds the drained records into
//! metric families:
//!
//! - numeric fields -> one gauge family per field (`starlink_<field>`),
//! - text fields -> the `starlink_info` family, one sample per device whose
//!   labels carry the text values,
//! - the `state` field -> `starlink_status`, valued with the state's index in
//!   the vocabulary.
//!
//! Families are built fresh on every scrape. Records are consumed exactly
//! once, so a scrape with nothing queued returns no families.

use std::collections::BTreeMap;
use std::sync::Arc;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;

use crate::families::{
    DEVICE_LABEL, FamilyBuilder, GaugeSample, gauge_family_name, info_family_name,
    sanitize_name, status_family_name,
};
use crate::identity::DeviceIdentity;
use crate::queue::SampleQueue;
use crate::record::{ID_FIELD, TelemetryRecord};
use crate::state;
use crate::value::MetricValue;

/// Obsolete signal-to-noise field. The dish no longer reports it; it is
/// never exported.
pub const IGNORED_FIELD: &str = "snr";

/// Appended to gauge names that would shadow the info or status family.
const RESERVED_SUFFIX: &str = "_value";

/// Drains queued records into metric families on demand.
#[derive(Clone)]
pub struct TelemetryCollector {
    queue: Arc<SampleQueue>,
    identity: Arc<DeviceIdentity>,
}

/// Families under construction during one scrape.
struct ScrapeFamilies {
    info: FamilyBuilder,
    status: FamilyBuilder,
    gauges: BTreeMap<String, FamilyBuilder>,
}

impl ScrapeFamilies {
    fn new() -> Self {
        Self {
            info: FamilyBuilder::new(info_family_name(), "Starlink Info"),
            status: FamilyBuilder::new(
                status_family_name(),
                format!("Starlink Status ({})", state::legend()),
            ),
            gauges: BTreeMap::new(),
        }
    }

    /// Get-or-create the gauge family for `field`. A field whose family name
    /// would be `starlink_info` or `starlink_status` gets a `_value` suffix.
    fn gauge(&mut self, field: &str, description: &str) -> &mut FamilyBuilder {
        let mut name = gauge_family_name(field);
        if name == info_family_name() || name == status_family_name() {
            log::warn!("numeric field {field} clashes with {name}; exporting it as {name}_value");
            name.push_str(RESERVED_SUFFIX);
        }
        self.gauges
            .entry(name)
            .or_insert_with_key(|name| FamilyBuilder::new(name.clone(), description))
    }

    fn fold(&mut self, record: &TelemetryRecord) {
        let id = record.device_id();
        let ts = record.timestamp_ms();
        let mut info_labels: Vec<(String, String)> = Vec::new();

        for (name, field) in record.fields() {
            if name == ID_FIELD || name == IGNORED_FIELD {
                continue;
            }
            match &field.value {
                MetricValue::Number(v) => {
                    self.gauge(name, &field.description)
                        .set(id, GaugeSample::for_device(id, *v, ts));
                }
                MetricValue::Text(text) => {
                    info_labels.push((sanitize_name(name), text.clone()));
                }
                MetricValue::State(state_name) => {
                    let code = state::state_code(state_name);
                    self.status
                        .set(id, GaugeSample::for_device(id, code as f64, ts));
                }
            }
        }

        if !info_labels.is_empty() {
            let mut labels = vec![(DEVICE_LABEL.to_string(), id.to_string())];
            labels.extend(info_labels);
            self.info.set(
                id,
                GaugeSample {
                    labels,
                    value: 1.0,
                    timestamp_ms: ts,
                },
            );
        }
    }

    fn finish(self) -> Vec<MetricFamily> {
        std::iter::once(self.info)
            .chain(std::iter::once(self.status))
            .chain(self.gauges.into_values())
            .filter(|b| !b.is_empty())
            .map(FamilyBuilder::build)
            .collect()
    }
}

impl TelemetryCollector {
    pub fn new(queue: Arc<SampleQueue>, identity: Arc<DeviceIdentity>) -> Self {
        Self { queue, identity }
    }

    pub fn queue(&self) -> &Arc<SampleQueue> {
        &self.queue
    }

    /// Last device identifier seen on a live record.
    pub fn last_device_id(&self) -> String {
        self.identity.get()
    }

    /// Drain the queue and build this scrape's families.
    pub fn on_scrape(&self) -> Vec<MetricFamily> {
        let records = self.queue.drain_all();
        if records.is_empty() {
            log::debug!("scrape: no records queued");
            return Vec::new();
        }

        let mut families = ScrapeFamilies::new();
        let mut folded = 0usize;
        for record in &records {
            if record.device_id().is_empty() {
                log::warn!(
                    "skipping record without device id at {}ms",
                    record.timestamp_ms()
                );
                continue;
            }
            if record.is_live() {
                self.identity.observe(record.device_id());
            }
            families.fold(record);
            folded += 1;
        }

        let out = families.finish();
        log::debug!(
            "scrape: {folded}/{} records folded into {} families",
            records.len(),
            out.len()
        );
        out
    }
}

impl Collector for TelemetryCollector {
    fn desc(&self) -> Vec<&Desc> {
        // Family names depend on which fields the dish reports.
        Vec::new()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.on_scrape()
    }
}
