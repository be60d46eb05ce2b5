//! History statistics.
//!
//! The dish keeps one sample per second in a ring buffer (`get_history`):
//! ping drop rate, ping latency and throughput, plus obstructed/scheduled
//! flags on older firmware. `current` counts every sample ever written, so
//! the sample with counter `c` lives at index `c % len` and the buffer holds
//! counters `current - len .. current`.
//!
//! A [`HistoryWindow`] remembers the counter it stopped at, collects the
//! samples that arrived since, and hands them out every `poll_loops` polls
//! (or immediately when flushed). [`HistoryReport::items`] turns a window
//! into feed items, one category per [`Mode`].

use serde_json::Value;

use crate::dish::{as_f64, lookup, lookup_opt};
use crate::feed::FeedItem;
use crate::modes::{Mode, ModeSet};
use crate::value::RawValue;

/// Category of the window bookkeeping fields (`samples`, `end_counter`).
const HISTORY_CATEGORY: &str = "history";

/// Histogram width of `run_seconds[]` and `run_minutes[]`.
const RUN_BUCKETS: usize = 60;

/// Throughput buckets of the loaded-latency group.
const LOAD_BUCKETS: usize = 15;

/// One second of dish history.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySample {
    pub counter: u64,
    /// Fraction of pings lost, 0..=1.
    pub drop_rate: f64,
    pub latency_ms: f64,
    pub downlink_bps: f64,
    pub uplink_bps: f64,
    /// Only reported by older firmware.
    pub obstructed: Option<bool>,
    /// Only reported by older firmware.
    pub scheduled: Option<bool>,
}

/// Parsed `dishGetHistory` ring buffer.
#[derive(Debug, Clone, Default)]
pub struct HistorySnapshot {
    current: u64,
    drop_rate: Vec<f64>,
    latency_ms: Vec<f64>,
    downlink_bps: Vec<f64>,
    uplink_bps: Vec<f64>,
    obstructed: Vec<bool>,
    scheduled: Vec<bool>,
}

fn numbers(obj: &Value, key: &str) -> Vec<f64> {
    lookup(obj, key)
        .and_then(Value::as_array)
        .map(|a| a.iter().map(|v| as_f64(v).unwrap_or(0.0)).collect())
        .unwrap_or_default()
}

fn flags(obj: &Value, key: &str) -> Vec<bool> {
    lookup(obj, key)
        .and_then(Value::as_array)
        .map(|a| a.iter().map(|v| v.as_bool().unwrap_or(false)).collect())
        .unwrap_or_default()
}

impl HistorySnapshot {
    /// Parse a `Handle` response carrying `dishGetHistory`.
    pub fn from_response(response: &Value) -> Result<Self, String> {
        let history = lookup(response, "dish_get_history")
            .filter(|v| v.is_object())
            .ok_or_else(|| "response has no dishGetHistory".to_string())?;
        let current = match lookup_opt(Some(history), "current") {
            None | Some(Value::Null) => 0,
            Some(v) => as_f64(v)
                .filter(|c| *c >= 0.0)
                .ok_or_else(|| format!("malformed history counter {v}"))? as u64,
        };
        Ok(Self {
            current,
            drop_rate: numbers(history, "pop_ping_drop_rate"),
            latency_ms: numbers(history, "pop_ping_latency_ms"),
            downlink_bps: numbers(history, "downlink_throughput_bps"),
            uplink_bps: numbers(history, "uplink_throughput_bps"),
            obstructed: flags(history, "obstructed"),
            scheduled: flags(history, "scheduled"),
        })
    }

    /// Total samples ever written.
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Ring buffer length.
    pub fn capacity(&self) -> usize {
        self.drop_rate.len()
    }

    /// Samples with counter in `start..current`, oldest first. Samples that
    /// have already been overwritten are skipped.
    pub fn samples_from(&self, start: u64) -> Vec<HistorySample> {
        let len = self.capacity() as u64;
        if len == 0 {
            return Vec::new();
        }
        let oldest = self.current.saturating_sub(len);
        (start.max(oldest)..self.current)
            .map(|counter| {
                let i = (counter % len) as usize;
                HistorySample {
                    counter,
                    drop_rate: self.drop_rate[i],
                    latency_ms: self.latency_ms.get(i).copied().unwrap_or(0.0),
                    downlink_bps: self.downlink_bps.get(i).copied().unwrap_or(0.0),
                    uplink_bps: self.uplink_bps.get(i).copied().unwrap_or(0.0),
                    obstructed: self.obstructed.get(i).copied(),
                    scheduled: self.scheduled.get(i).copied(),
                }
            })
            .collect()
    }
}

/// Samples collected for one report.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryReport {
    pub samples: Vec<HistorySample>,
    pub end_counter: u64,
}

/// Tracks which history samples have been reported.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    next_counter: Option<u64>,
    initial_samples: u64,
    poll_loops: u32,
    polls: u32,
    pending: Vec<HistorySample>,
}

impl HistoryWindow {
    /// The first poll covers the last `initial_samples` samples; later polls
    /// cover what arrived since. A report is produced every `poll_loops`
    /// polls (at least 1).
    pub fn new(initial_samples: u64, poll_loops: u32) -> Self {
        Self {
            next_counter: None,
            initial_samples,
            poll_loops: poll_loops.max(1),
            polls: 0,
            pending: Vec::new(),
        }
    }

    /// Samples collected but not yet reported.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Take in a snapshot. Returns a report when the window is complete or
    /// `flush` is set.
    pub fn advance(&mut self, snapshot: &HistorySnapshot, flush: bool) -> Option<HistoryReport> {
        let current = snapshot.current();
        let start = match self.next_counter {
            Some(next) if next <= current => next,
            Some(next) => {
                log::info!("history counter went back from {next} to {current}, restarting window");
                current.saturating_sub(self.initial_samples)
            }
            None => current.saturating_sub(self.initial_samples),
        };
        let fresh = snapshot.samples_from(start);
        if let Some(first) = fresh.first().filter(|s| s.counter > start) {
            log::warn!("{} history samples overwritten before they were read", first.counter - start);
        }
        self.next_counter = Some(current);
        self.pending.extend(fresh);
        self.polls += 1;

        if flush || self.polls >= self.poll_loops {
            self.polls = 0;
            Some(HistoryReport {
                samples: std::mem::take(&mut self.pending),
                end_counter: current,
            })
        } else {
            None
        }
    }
}

impl HistoryReport {
    /// Feed items for the selected history groups.
    pub fn items(&self, modes: ModeSet) -> Vec<FeedItem> {
        let mut items = vec![
            FeedItem::scalar("samples", self.samples.len() as i64, HISTORY_CATEGORY),
            FeedItem::scalar("end_counter", self.end_counter as f64, HISTORY_CATEGORY),
        ];
        for mode in modes.iter() {
            match mode {
                Mode::Status => {}
                Mode::PingDrop => ping_drop(&self.samples, &mut items),
                Mode::PingRunLength => ping_run_length(&self.samples, &mut items),
                Mode::PingLatency => ping_latency(&self.samples, &mut items),
                Mode::PingLoadedLatency => ping_loaded_latency(&self.samples, &mut items),
                Mode::Usage => usage(&self.samples, &mut items),
            }
        }
        items
    }
}

fn push(items: &mut Vec<FeedItem>, mode: Mode, name: &str, value: impl Into<RawValue>) {
    items.push(FeedItem::scalar(name, value, mode.name()));
}

fn push_sequence(items: &mut Vec<FeedItem>, mode: Mode, name: &str, values: Vec<RawValue>) {
    items.push(FeedItem::Sequence {
        name: name.to_string(),
        values,
        category: mode.name().to_string(),
        start: 1,
    });
}

/// Count and total drop over the samples matching `pred`, or `None` when the
/// firmware does not report the flag `pred` looks at.
fn drop_subset(
    samples: &[HistorySample],
    pred: impl Fn(&HistorySample) -> Option<bool>,
) -> Option<(u64, f64, u64)> {
    if samples.iter().all(|s| pred(s).is_none()) {
        return None;
    }
    let hits = samples.iter().filter(|s| pred(*s) == Some(true));
    Some(hits.fold((0, 0.0, 0), |(count, total, full), s| {
        (count + 1, total + s.drop_rate, full + u64::from(s.drop_rate >= 1.0))
    }))
}

fn ping_drop(samples: &[HistorySample], items: &mut Vec<FeedItem>) {
    let mode = Mode::PingDrop;
    let total: f64 = samples.iter().map(|s| s.drop_rate).sum();
    let full = samples.iter().filter(|s| s.drop_rate >= 1.0).count() as i64;
    push(items, mode, "total_ping_drop", total);
    push(items, mode, "count_full_ping_drop", full);

    let obstructed = drop_subset(samples, |s| s.obstructed);
    push(items, mode, "count_obstructed", obstructed.map(|o| o.0 as f64));
    push(items, mode, "total_obstructed_ping_drop", obstructed.map(|o| o.1));
    push(items, mode, "count_full_obstructed_ping_drop", obstructed.map(|o| o.2 as f64));

    let unscheduled = drop_subset(samples, |s| s.scheduled.map(|v| !v));
    push(items, mode, "count_unscheduled", unscheduled.map(|u| u.0 as f64));
    push(items, mode, "total_unscheduled_ping_drop", unscheduled.map(|u| u.1));
    push(items, mode, "count_full_unscheduled_ping_drop", unscheduled.map(|u| u.2 as f64));
}

/// Runs of consecutive full-drop seconds.
///
/// A run touching the start of the window continues one from the previous
/// window and is only reported as `init_run_fragment`; one touching the end
/// is `final_run_fragment`. Completed runs are accumulated (in seconds) into
/// per-second buckets up to a minute and per-minute buckets beyond.
fn ping_run_length(samples: &[HistorySample], items: &mut Vec<FeedItem>) {
    let mode = Mode::PingRunLength;
    let mut seconds = [0u64; RUN_BUCKETS];
    let mut minutes = [0u64; RUN_BUCKETS];
    let mut init_run: Option<u64> = None;
    let mut run = 0u64;

    for s in samples {
        if s.drop_rate >= 1.0 {
            run += 1;
        } else if run > 0 {
            match init_run {
                None => init_run = Some(run),
                Some(_) if run as usize <= RUN_BUCKETS => seconds[run as usize - 1] += run,
                Some(_) => {
                    let bucket = ((run as usize - 1) / RUN_BUCKETS - 1).min(RUN_BUCKETS - 1);
                    minutes[bucket] += run;
                }
            }
            run = 0;
        } else if init_run.is_none() {
            init_run = Some(0);
        }
    }
    // a window that is one long run reports it once, as the initial fragment
    let (init_run, final_run) = match init_run {
        Some(init) => (init, run),
        None => (run, 0),
    };

    push(items, mode, "init_run_fragment", init_run as i64);
    push(items, mode, "final_run_fragment", final_run as i64);
    let to_raw = |b: &[u64; RUN_BUCKETS]| -> Vec<RawValue> {
        b.iter().map(|v| RawValue::from(*v as i64)).collect()
    };
    push_sequence(items, mode, "run_seconds[1,]", to_raw(&seconds));
    push_sequence(items, mode, "run_minutes[1,]", to_raw(&minutes));
}

/// Deciles (0%, 10%, ..., 100%) of weighted values, by cumulative weight.
fn weighted_deciles(values: &mut [(f64, f64)]) -> Vec<f64> {
    values.sort_by(|a, b| a.0.total_cmp(&b.0));
    let total: f64 = values.iter().map(|v| v.1).sum();
    (0..=10)
        .map(|d| {
            let target = total * d as f64 / 10.0;
            let mut acc = 0.0_f64;
            values
                .iter()
                .find(|(_, w)| {
                    acc += *w;
                    acc >= target && *w > 0.0
                })
                .or(values.last())
                .map_or(0.0, |v| v.0)
        })
        .collect()
}

/// Deciles with linear interpolation between neighbours.
fn deciles(values: &mut [f64]) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    let n = values.len();
    (0..=10)
        .map(|d| {
            let pos = (n - 1) as f64 * d as f64 / 10.0;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn ping_latency(samples: &[HistorySample], items: &mut Vec<FeedItem>) {
    let mode = Mode::PingLatency;
    // any sample with some pings answered, weighted by the answered share
    let mut all: Vec<(f64, f64)> = samples
        .iter()
        .filter(|s| s.drop_rate < 1.0)
        .map(|s| (s.latency_ms, 1.0 - s.drop_rate))
        .collect();
    let mut full: Vec<f64> = samples
        .iter()
        .filter(|s| s.drop_rate == 0.0)
        .map(|s| s.latency_ms)
        .collect();

    let weight: f64 = all.iter().map(|v| v.1).sum();
    let mean_all = (weight > 0.0).then(|| all.iter().map(|(l, w)| l * w).sum::<f64>() / weight);
    push(items, mode, "mean_all_ping_latency", mean_all);
    let deciles_all = if weight > 0.0 {
        weighted_deciles(&mut all).into_iter().map(RawValue::from).collect()
    } else {
        vec![RawValue::Absent; 11]
    };
    push_sequence(items, mode, "deciles_all_ping_latency[]", deciles_all);

    if full.is_empty() {
        push(items, mode, "mean_full_ping_latency", RawValue::Absent);
        push_sequence(items, mode, "deciles_full_ping_latency[]", vec![RawValue::Absent; 11]);
        push(items, mode, "stdev_full_ping_latency", RawValue::Absent);
        return;
    }
    let m = mean(&full);
    let variance = full.iter().map(|l| (l - m).powi(2)).sum::<f64>() / full.len() as f64;
    push(items, mode, "mean_full_ping_latency", m);
    let deciles_full = deciles(&mut full).into_iter().map(RawValue::from).collect();
    push_sequence(items, mode, "deciles_full_ping_latency[]", deciles_full);
    push(items, mode, "stdev_full_ping_latency", variance.sqrt());
}

/// Throughput bucket: 0 below 1 Mbps, then one bucket per doubling.
fn load_bucket(sample: &HistorySample) -> usize {
    let mbps = (sample.downlink_bps + sample.uplink_bps) / 1_000_000.0;
    if mbps < 1.0 {
        0
    } else {
        (mbps.log2().floor() as usize + 1).min(LOAD_BUCKETS - 1)
    }
}

/// Latency of fully answered seconds, bucketed by concurrent throughput.
fn ping_loaded_latency(samples: &[HistorySample], items: &mut Vec<FeedItem>) {
    let mode = Mode::PingLoadedLatency;
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); LOAD_BUCKETS];
    for s in samples.iter().filter(|s| s.drop_rate == 0.0) {
        buckets[load_bucket(s)].push(s.latency_ms);
    }

    let mut counts: Vec<RawValue> = Vec::with_capacity(LOAD_BUCKETS);
    let mut mins: Vec<RawValue> = Vec::with_capacity(LOAD_BUCKETS);
    let mut medians: Vec<RawValue> = Vec::with_capacity(LOAD_BUCKETS);
    let mut maxes: Vec<RawValue> = Vec::with_capacity(LOAD_BUCKETS);
    for bucket in &mut buckets {
        counts.push(RawValue::from(bucket.len() as i64));
        if bucket.is_empty() {
            mins.push(RawValue::Absent);
            medians.push(RawValue::Absent);
            maxes.push(RawValue::Absent);
            continue;
        }
        let d = deciles(bucket);
        mins.push(d[0].into());
        medians.push(d[5].into());
        maxes.push(d[10].into());
    }
    push_sequence(items, mode, "load_bucket_samples[]", counts);
    push_sequence(items, mode, "load_bucket_min_latency[]", mins);
    push_sequence(items, mode, "load_bucket_median_latency[]", medians);
    push_sequence(items, mode, "load_bucket_max_latency[]", maxes);
}

/// Bytes moved over the window; each sample covers one second.
fn usage(samples: &[HistorySample], items: &mut Vec<FeedItem>) {
    let mode = Mode::Usage;
    let down: f64 = samples.iter().map(|s| s.downlink_bps).sum();
    let up: f64 = samples.iter().map(|s| s.uplink_bps).sum();
    push(items, mode, "download_usage", (down / 8.0).round());
    push(items, mode, "upload_usage", (up / 8.0).round());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(counter: u64, drop_rate: f64, latency_ms: f64) -> HistorySample {
        HistorySample {
            counter,
            drop_rate,
            latency_ms,
            downlink_bps: 0.0,
            uplink_bps: 0.0,
            obstructed: None,
            scheduled: None,
        }
    }

    fn drops(rates: &[f64]) -> Vec<HistorySample> {
        rates
            .iter()
            .enumerate()
            .map(|(i, d)| sample(i as u64, *d, 30.0))
            .collect()
    }

    fn snapshot(current: u64, drop: &[f64]) -> HistorySnapshot {
        HistorySnapshot {
            current,
            drop_rate: drop.to_vec(),
            latency_ms: (0..drop.len()).map(|i| 20.0 + i as f64).collect(),
            ..Default::default()
        }
    }

    fn scalar(items: &[FeedItem], name: &str) -> Option<RawValue> {
        items.iter().find_map(|i| match i {
            FeedItem::Scalar { name: n, value, .. } if n == name => Some(value.clone()),
            _ => None,
        })
    }

    fn sequence(items: &[FeedItem], name: &str) -> Vec<RawValue> {
        items
            .iter()
            .find_map(|i| match i {
                FeedItem::Sequence { name: n, values, .. } if n == name => Some(values.clone()),
                _ => None,
            })
            .unwrap()
    }

    fn report(samples: Vec<HistorySample>, modes: &[Mode]) -> Vec<FeedItem> {
        HistoryReport {
            samples,
            end_counter: 100,
        }
        .items(modes.iter().copied().collect())
    }

    #[test]
    fn test_parse_response() {
        let doc = serde_json::json!({
            "dishGetHistory": {
                "current": "1003",
                "popPingDropRate": [0, 0.5, 1, 0],
                "popPingLatencyMs": [20, 21, 22, 23],
                "downlinkThroughputBps": [8000, 8000, 8000, 8000],
                "obstructed": [false, true, false, false]
            }
        });
        let snap = HistorySnapshot::from_response(&doc).unwrap();
        assert_eq!(snap.current(), 1003);
        assert_eq!(snap.capacity(), 4);
        let samples = snap.samples_from(1001);
        assert_eq!(samples.len(), 2);
        // counter 1001 -> index 1
        assert_eq!(samples[0].counter, 1001);
        assert_eq!(samples[0].drop_rate, 0.5);
        assert_eq!(samples[0].obstructed, Some(true));
        assert_eq!(samples[1].latency_ms, 22.0);
        assert_eq!(samples[1].uplink_bps, 0.0);
        assert_eq!(samples[1].scheduled, None);
    }

    #[test]
    fn test_parse_rejects_other_responses() {
        assert!(HistorySnapshot::from_response(&serde_json::json!({"dishGetStatus": {}})).is_err());
        let bad = serde_json::json!({"dishGetHistory": {"current": "soon"}});
        assert!(HistorySnapshot::from_response(&bad).is_err());
    }

    #[test]
    fn test_samples_from_skips_overwritten() {
        let snap = snapshot(10, &[0.0; 4]);
        let counters: Vec<_> = snap.samples_from(0).iter().map(|s| s.counter).collect();
        assert_eq!(counters, vec![6, 7, 8, 9]);
        assert!(snap.samples_from(10).is_empty());
        assert!(HistorySnapshot::default().samples_from(0).is_empty());
    }

    #[test]
    fn test_window_reads_only_new_samples() {
        let mut window = HistoryWindow::new(2, 1);
        let first = window.advance(&snapshot(10, &[0.0; 8]), false).unwrap();
        assert_eq!(first.samples.iter().map(|s| s.counter).collect::<Vec<_>>(), vec![8, 9]);
        assert_eq!(first.end_counter, 10);

        let second = window.advance(&snapshot(13, &[0.0; 8]), false).unwrap();
        assert_eq!(second.samples.iter().map(|s| s.counter).collect::<Vec<_>>(), vec![10, 11, 12]);

        let idle = window.advance(&snapshot(13, &[0.0; 8]), false).unwrap();
        assert!(idle.samples.is_empty());
    }

    #[test]
    fn test_window_accumulates_and_flushes_partial() {
        let mut window = HistoryWindow::new(1, 3);
        assert!(window.advance(&snapshot(5, &[0.0; 8]), false).is_none());
        assert!(window.advance(&snapshot(7, &[0.0; 8]), false).is_none());
        assert_eq!(window.pending(), 3);

        let flushed = window.advance(&snapshot(8, &[0.0; 8]), true).unwrap();
        assert_eq!(flushed.samples.len(), 4);
        assert_eq!(flushed.end_counter, 8);
        assert_eq!(window.pending(), 0);

        // the cycle restarts after a flush
        assert!(window.advance(&snapshot(9, &[0.0; 8]), false).is_none());
    }

    #[test]
    fn test_window_counter_reset() {
        let mut window = HistoryWindow::new(2, 1);
        window.advance(&snapshot(500, &[0.0; 8]), false);
        let after_reboot = window.advance(&snapshot(3, &[0.0; 8]), false).unwrap();
        assert_eq!(after_reboot.samples.iter().map(|s| s.counter).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_general_fields_and_categories() {
        let items = report(drops(&[0.0, 1.0]), &[Mode::PingDrop, Mode::Usage]);
        assert_eq!(scalar(&items, "samples"), Some(RawValue::Number(2.0)));
        assert_eq!(scalar(&items, "end_counter"), Some(RawValue::Number(100.0)));
        for item in &items {
            let FeedItem::Scalar { name, category, .. } = item else {
                continue;
            };
            let expected = match name.as_str() {
                "samples" | "end_counter" => "history",
                "download_usage" | "upload_usage" => "usage",
                _ => "ping_drop",
            };
            assert_eq!(category, expected, "{name}");
        }
        assert_eq!(scalar(&items, "init_run_fragment"), None);
    }

    #[test]
    fn test_ping_drop() {
        let items = report(drops(&[0.0, 0.25, 1.0, 1.0, 0.5]), &[Mode::PingDrop]);
        assert_eq!(scalar(&items, "total_ping_drop"), Some(RawValue::Number(2.75)));
        assert_eq!(scalar(&items, "count_full_ping_drop"), Some(RawValue::Number(2.0)));
        // no legacy flags reported
        assert_eq!(scalar(&items, "count_obstructed"), Some(RawValue::Absent));
        assert_eq!(scalar(&items, "total_unscheduled_ping_drop"), Some(RawValue::Absent));
    }

    #[test]
    fn test_ping_drop_legacy_flags() {
        let mut samples = drops(&[1.0, 0.5, 0.0]);
        samples[0].obstructed = Some(true);
        samples[1].obstructed = Some(true);
        samples[2].obstructed = Some(false);
        for s in &mut samples {
            s.scheduled = Some(true);
        }
        samples[0].scheduled = Some(false);
        let items = report(samples, &[Mode::PingDrop]);
        assert_eq!(scalar(&items, "count_obstructed"), Some(RawValue::Number(2.0)));
        assert_eq!(scalar(&items, "total_obstructed_ping_drop"), Some(RawValue::Number(1.5)));
        assert_eq!(scalar(&items, "count_full_obstructed_ping_drop"), Some(RawValue::Number(1.0)));
        assert_eq!(scalar(&items, "count_unscheduled"), Some(RawValue::Number(1.0)));
        assert_eq!(scalar(&items, "count_full_unscheduled_ping_drop"), Some(RawValue::Number(1.0)));
    }

    #[test]
    fn test_run_lengths() {
        // init fragment 2, complete runs of 1 and 3, final fragment 1
        let rates = [1.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0, 0.5, 1.0];
        let items = report(drops(&rates), &[Mode::PingRunLength]);
        assert_eq!(scalar(&items, "init_run_fragment"), Some(RawValue::Number(2.0)));
        assert_eq!(scalar(&items, "final_run_fragment"), Some(RawValue::Number(1.0)));
        let seconds = sequence(&items, "run_seconds[1,]");
        assert_eq!(seconds.len(), 60);
        assert_eq!(seconds[0], RawValue::Number(1.0));
        assert_eq!(seconds[2], RawValue::Number(3.0));
        assert_eq!(seconds[1], RawValue::Number(0.0));
    }

    #[test]
    fn test_single_run_is_initial_fragment() {
        let items = report(drops(&[1.0; 5]), &[Mode::PingRunLength]);
        assert_eq!(scalar(&items, "init_run_fragment"), Some(RawValue::Number(5.0)));
        assert_eq!(scalar(&items, "final_run_fragment"), Some(RawValue::Number(0.0)));
    }

    #[test]
    fn test_long_runs_go_to_minutes() {
        let mut rates = vec![0.0];
        rates.extend(std::iter::repeat_n(1.0, 150));
        rates.push(0.0);
        let items = report(drops(&rates), &[Mode::PingRunLength]);
        let minutes = sequence(&items, "run_minutes[1,]");
        // 150 s is in the 2-3 minute bucket
        assert_eq!(minutes[1], RawValue::Number(150.0));
        assert_eq!(scalar(&items, "init_run_fragment"), Some(RawValue::Number(0.0)));
    }

    #[test]
    fn test_ping_latency() {
        let samples = vec![
            sample(0, 0.0, 20.0),
            sample(1, 0.0, 40.0),
            sample(2, 0.5, 60.0),
            sample(3, 1.0, 999.0),
        ];
        let items = report(samples, &[Mode::PingLatency]);
        assert_eq!(scalar(&items, "mean_full_ping_latency"), Some(RawValue::Number(30.0)));
        assert_eq!(scalar(&items, "stdev_full_ping_latency"), Some(RawValue::Number(10.0)));
        // (20 + 40 + 60 * 0.5) / 2.5
        assert_eq!(scalar(&items, "mean_all_ping_latency"), Some(RawValue::Number(36.0)));
        let full = sequence(&items, "deciles_full_ping_latency[]");
        assert_eq!(full.len(), 11);
        assert_eq!(full[0], RawValue::Number(20.0));
        assert_eq!(full[5], RawValue::Number(30.0));
        assert_eq!(full[10], RawValue::Number(40.0));
        let all = sequence(&items, "deciles_all_ping_latency[]");
        assert_eq!(all[10], RawValue::Number(60.0));
    }

    #[test]
    fn test_ping_latency_without_answers() {
        let items = report(drops(&[1.0, 1.0]), &[Mode::PingLatency]);
        assert_eq!(scalar(&items, "mean_all_ping_latency"), Some(RawValue::Absent));
        assert_eq!(scalar(&items, "mean_full_ping_latency"), Some(RawValue::Absent));
        assert_eq!(scalar(&items, "stdev_full_ping_latency"), Some(RawValue::Absent));
    }

    #[test]
    fn test_loaded_latency_buckets() {
        let mut samples = vec![sample(0, 0.0, 20.0), sample(1, 0.0, 50.0), sample(2, 0.0, 70.0)];
        samples[1].downlink_bps = 3_000_000.0; // 3 Mbps -> bucket 2
        samples[2].downlink_bps = 2_500_000.0;
        samples[2].uplink_bps = 500_000.0;
        let items = report(samples, &[Mode::PingLoadedLatency]);
        let counts = sequence(&items, "load_bucket_samples[]");
        assert_eq!(counts.len(), 15);
        assert_eq!(counts[0], RawValue::Number(1.0));
        assert_eq!(counts[2], RawValue::Number(2.0));
        let medians = sequence(&items, "load_bucket_median_latency[]");
        assert_eq!(medians[2], RawValue::Number(60.0));
        assert_eq!(medians[1], RawValue::Absent);
    }

    #[test]
    fn test_usage_bytes() {
        let mut samples = drops(&[0.0, 0.0]);
        samples[0].downlink_bps = 8_000.0;
        samples[1].downlink_bps = 16_000.0;
        samples[1].uplink_bps = 800.0;
        let items = report(samples, &[Mode::Usage]);
        assert_eq!(scalar(&items, "download_usage"), Some(RawValue::Number(3_000.0)));
        assert_eq!(scalar(&items, "upload_usage"), Some(RawValue::Number(100.0)));
    }
}
