//! Starlink dish feed.
//!
//! Obtains the dish's `get_status` (and, when a history group is selected,
//! `get_history`) answers as JSON, either by running `grpcurl` against the
//! dish's gRPC endpoint or by re-reading saved responses from disk. Status is
//! flattened into `status` feed items; history samples go through a
//! [`HistoryWindow`] and come out as one item group per [`Mode`].
//!
//! `grpcurl` renders proto3 messages with lowerCamelCase keys, omits fields
//! holding their default value and prints 64-bit integers as strings; the
//! flattening below accepts camelCase or snake_case keys, treats missing
//! fields as their proto default and parses numeric strings.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::feed::{FeedItem, FeedPoll, TelemetryFeed};
use crate::history::{HistorySnapshot, HistoryWindow};
use crate::modes::{Mode, ModeSet};
use crate::value::RawValue;

/// Default dish gRPC endpoint.
pub const DEFAULT_TARGET: &str = "192.168.100.1:9200";

/// gRPC method answering every dish request.
const HANDLE_METHOD: &str = "SpaceX.API.Device.Device/Handle";

/// Category tag for status items.
const CATEGORY: &str = "status";

/// Alert names in `DishAlerts` field-number order; bit `i` of `alerts` is
/// set when the alert at index `i` is active.
const ALERT_BITS: &[&str] = &[
    "motors_stuck",
    "thermal_shutdown",
    "thermal_throttle",
    "unexpected_location",
    "mast_not_near_vertical",
    "slow_ethernet_speeds",
    "roaming",
    "install_pending",
    "is_heating",
    "power_supply_thermal_throttle",
    "is_power_save_idle",
    "moving_while_not_mobile",
    "moving_too_fast_for_policy",
];

/// What to collect from the dish.
#[derive(Debug, Clone, Copy)]
pub struct DishOptions {
    pub modes: ModeSet,
    /// History samples covered by the first poll.
    pub samples: u64,
    /// Polls accumulated into one history report.
    pub poll_loops: u32,
}

impl Default for DishOptions {
    fn default() -> Self {
        Self {
            modes: ModeSet::default(),
            samples: 1,
            poll_loops: 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Request {
    Status,
    History,
}

impl Request {
    fn body(self) -> &'static str {
        match self {
            Request::Status => r#"{"get_status":{}}"#,
            Request::History => r#"{"get_history":{}}"#,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Request::Status => "status",
            Request::History => "history",
        }
    }
}

/// Where the response documents come from.
#[derive(Debug, Clone)]
enum DishSource {
    Grpcurl {
        program: String,
        target: String,
    },
    Files {
        status: PathBuf,
        history: Option<PathBuf>,
    },
}

/// Telemetry feed backed by the dish's device service.
#[derive(Debug)]
pub struct DishFeed {
    source: DishSource,
    name: String,
    modes: ModeSet,
    window: HistoryWindow,
}

fn require_file(kind: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::feed_init(format!(
            "{kind} file {} does not exist",
            path.display()
        )))
    }
}

impl DishFeed {
    fn with_source(source: DishSource, name: String, options: DishOptions) -> Self {
        log::debug!("{name}: collecting {}", options.modes);
        Self {
            source,
            name,
            modes: options.modes,
            window: HistoryWindow::new(options.samples, options.poll_loops),
        }
    }

    /// Query `target` with the `grpcurl` executable `program`.
    ///
    /// Fails if `program` cannot be found.
    pub fn grpcurl(program: &str, target: &str, options: DishOptions) -> Result<Self> {
        if !command_exists(program) {
            return Err(Error::feed_init(format!(
                "{program} not found; install grpcurl or pass --status-file"
            )));
        }
        let source = DishSource::Grpcurl {
            program: program.to_string(),
            target: target.to_string(),
        };
        Ok(Self::with_source(source, format!("dish@{target}"), options))
    }

    /// Re-read saved `get_status` (and `get_history`) responses on every poll.
    ///
    /// History groups need a history file.
    pub fn from_files(
        status: impl AsRef<Path>,
        history: Option<&Path>,
        options: DishOptions,
    ) -> Result<Self> {
        let status = status.as_ref();
        require_file("status", status)?;
        match history {
            Some(path) => require_file("history", path)?,
            None if options.modes.needs_history() => {
                return Err(Error::feed_init(format!(
                    "modes {} need a history file",
                    options.modes
                )));
            }
            None => {}
        }
        let source = DishSource::Files {
            status: status.to_path_buf(),
            history: history.map(Path::to_path_buf),
        };
        Ok(Self::with_source(source, format!("file:{}", status.display()), options))
    }

    fn query(&self, request: Request) -> std::result::Result<Value, String> {
        let body = match &self.source {
            DishSource::Grpcurl { program, target } => run_command(
                program,
                &["-plaintext", "-d", request.body(), target, HANDLE_METHOD],
            )?,
            DishSource::Files { status, history } => {
                let path = match request {
                    Request::Status => Some(status),
                    Request::History => history.as_ref(),
                }
                .ok_or_else(|| format!("no {} file configured", request.name()))?;
                std::fs::read_to_string(path)
                    .map_err(|e| format!("reading {}: {e}", path.display()))?
            }
        };
        serde_json::from_str(&body)
            .map_err(|e| format!("malformed {} response: {e}", request.name()))
    }

    /// History group items; empty while the window is still filling.
    fn history_items(&mut self, flush: bool) -> std::result::Result<Vec<FeedItem>, String> {
        let response = self.query(Request::History)?;
        let snapshot = HistorySnapshot::from_response(&response)?;
        Ok(self
            .window
            .advance(&snapshot, flush)
            .map(|report| report.items(self.modes))
            .unwrap_or_default())
    }

    fn unavailable(&self, flush: bool, reason: String) -> FeedPoll {
        if flush && self.window.pending() > 0 {
            log::warn!(
                "{}: dropping {} history samples not yet reported",
                self.name,
                self.window.pending()
            );
        }
        FeedPoll::unavailable(reason)
    }
}

impl TelemetryFeed for DishFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&mut self, flush: bool) -> FeedPoll {
        // status carries the device id, so it is fetched even when not exported
        let response = match self.query(Request::Status) {
            Ok(v) => v,
            Err(reason) => return self.unavailable(flush, reason),
        };
        let timestamp = SystemTime::now();
        let mut items = match status_items(&response) {
            Ok(items) => items,
            Err(reason) => return self.unavailable(flush, reason),
        };
        if !self.modes.contains(Mode::Status) {
            items.retain(|i| i.name() == "id");
        }
        if self.modes.needs_history() {
            match self.history_items(flush) {
                Ok(history) => items.extend(history),
                Err(reason) => return self.unavailable(flush, reason),
            }
        }
        FeedPoll::ok(timestamp, items)
    }

    fn shutdown(&mut self) {
        log::debug!("{}: closed", self.name);
    }
}

/// Flatten a `Handle` response carrying `dishGetStatus` into feed items.
pub fn status_items(response: &Value) -> std::result::Result<Vec<FeedItem>, String> {
    let status = lookup(response, "dish_get_status")
        .filter(|v| v.is_object())
        .ok_or_else(|| "response has no dishGetStatus".to_string())?;
    let device_info = lookup(status, "device_info");
    let device_state = lookup(status, "device_state");
    let obstruction = lookup(status, "obstruction_stats");

    let mut items = Vec::new();
    let mut scalar = |name: &str, value: Option<RawValue>| match value {
        Some(v) => items.push(FeedItem::scalar(name, v, CATEGORY)),
        None => log::warn!("skipping malformed field {name}"),
    };

    scalar("id", text(device_info, "id"));
    scalar("hardware_version", text(device_info, "hardware_version"));
    scalar("software_version", text(device_info, "software_version"));
    scalar("state", Some(RawValue::Text(dish_state(status))));
    scalar("uptime", number(device_state, "uptime_s"));
    // no longer reported by the dish
    scalar("snr", Some(RawValue::Absent));
    for key in [
        "seconds_to_first_nonempty_slot",
        "pop_ping_drop_rate",
        "downlink_throughput_bps",
        "uplink_throughput_bps",
        "pop_ping_latency_ms",
    ] {
        scalar(key, number(Some(status), key));
    }

    let active_alerts = alerts(lookup(status, "alerts"));
    let mask = active_alerts
        .iter()
        .filter_map(|name| ALERT_BITS.iter().position(|b| b == name))
        .fold(0u64, |mask, bit| mask | (1u64 << bit));
    scalar("alerts", Some(RawValue::Number(mask as f64)));
    for name in &active_alerts {
        scalar(&format!("alert_{name}"), Some(RawValue::Bool(true)));
    }

    scalar("fraction_obstructed", number(obstruction, "fraction_obstructed"));
    scalar("currently_obstructed", boolean(obstruction, "currently_obstructed"));
    scalar("seconds_obstructed", Some(RawValue::Absent));
    let (duration, interval) = obstruction_timing(obstruction);
    scalar("obstruction_duration", Some(duration));
    scalar("obstruction_interval", Some(interval));
    scalar("direction_azimuth", number(Some(status), "boresight_azimuth_deg"));
    scalar("direction_elevation", number(Some(status), "boresight_elevation_deg"));
    scalar(
        "is_snr_above_noise_floor",
        boolean(Some(status), "is_snr_above_noise_floor"),
    );

    if let Some(wedges) =
        lookup_opt(obstruction, "wedge_fraction_obstructed").and_then(Value::as_array)
    {
        items.push(FeedItem::Sequence {
            name: "wedges_fraction_obstructed[]".to_string(),
            values: wedges.iter().filter_map(raw_scalar).collect(),
            category: CATEGORY.to_string(),
            start: 0,
        });
    }

    Ok(items)
}

/// Connection state: `CONNECTED` unless an outage is reported.
fn dish_state(status: &Value) -> String {
    match lookup(status, "outage") {
        Some(outage) => match lookup(outage, "cause").and_then(Value::as_str) {
            Some("NO_SCHEDULE") => "SEARCHING".to_string(),
            Some(cause) => cause.to_string(),
            None => "UNKNOWN".to_string(),
        },
        None => "CONNECTED".to_string(),
    }
}

/// Names (snake_case) of the alerts set to true.
fn alerts(alerts: Option<&Value>) -> Vec<String> {
    let Some(Value::Object(map)) = alerts else {
        return Vec::new();
    };
    map.iter()
        .filter(|(_, v)| v.as_bool() == Some(true))
        .map(|(k, _)| camel_to_snake(k))
        .collect()
}

fn obstruction_timing(obstruction: Option<&Value>) -> (RawValue, RawValue) {
    let duration =
        lookup_opt(obstruction, "avg_prolonged_obstruction_duration_s").and_then(as_f64);
    let interval =
        lookup_opt(obstruction, "avg_prolonged_obstruction_interval_s").and_then(as_f64);
    match (duration, interval) {
        (Some(d), Some(i)) if d > 0.0 && i.is_finite() => {
            (RawValue::Number(d), RawValue::Number(i))
        }
        _ => (RawValue::Absent, RawValue::Absent),
    }
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

/// Look `key` (snake_case) up in `obj`, also trying its camelCase form.
pub(crate) fn lookup<'a>(obj: &'a Value, key: &str) -> Option<&'a Value> {
    obj.get(key).or_else(|| obj.get(snake_to_camel(key)))
}

pub(crate) fn lookup_opt<'a>(obj: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    obj.and_then(|o| lookup(o, key))
}

pub(crate) fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Numeric field; missing means 0. `None` if present but not numeric.
fn number(obj: Option<&Value>, key: &str) -> Option<RawValue> {
    match lookup_opt(obj, key) {
        None | Some(Value::Null) => Some(RawValue::Number(0.0)),
        Some(v) => as_f64(v).map(RawValue::Number),
    }
}

/// Boolean field; missing means false.
fn boolean(obj: Option<&Value>, key: &str) -> Option<RawValue> {
    match lookup_opt(obj, key) {
        None | Some(Value::Null) => Some(RawValue::Bool(false)),
        Some(Value::Bool(b)) => Some(RawValue::Bool(*b)),
        Some(_) => None,
    }
}

/// Text field; missing means empty.
fn text(obj: Option<&Value>, key: &str) -> Option<RawValue> {
    match lookup_opt(obj, key) {
        None | Some(Value::Null) => Some(RawValue::Text(String::new())),
        Some(Value::String(s)) => Some(RawValue::Text(s.clone())),
        Some(_) => None,
    }
}

fn raw_scalar(v: &Value) -> Option<RawValue> {
    match v {
        Value::Null => Some(RawValue::Absent),
        Value::Bool(b) => Some(RawValue::Bool(*b)),
        Value::Number(_) | Value::String(_) => as_f64(v).map(RawValue::Number),
        _ => None,
    }
}

fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Subprocess helpers
// ---------------------------------------------------------------------------

/// Check if a command exists by running `which`. Paths are checked directly.
fn command_exists(name: &str) -> bool {
    if name.contains('/') {
        return Path::new(name).is_file();
    }
    std::process::Command::new("which")
        .arg(name)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run a subprocess and return its stdout, or a reason built from its stderr.
fn run_command(program: &str, args: &[&str]) -> std::result::Result<String, String> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| format!("failed to run {program}: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
