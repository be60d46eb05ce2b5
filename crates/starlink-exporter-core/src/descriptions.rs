//! Field name -> human-readable description lookup.
//!
//! Used as the help text of gauge families. Names without an entry describe
//! themselves.

use std::collections::HashMap;

/// Built-in legend for dish fields whose meaning is not obvious from the name.
const DISH_FIELD_DESCRIPTIONS: &[(&str, &str)] = &[
    // status
    ("alerts", "Alerts bit field"),
    // ping_drop
    ("samples", "Parsed samples"),
    ("end_counter", "Sample counter"),
    ("total_ping_drop", "Total ping drop"),
    ("count_full_ping_drop", "Count of drop == 1"),
    ("count_obstructed", "Obstructed"),
    ("total_obstructed_ping_drop", "Obstructed ping drop"),
    ("count_full_obstructed_ping_drop", "Obstructed drop == 1"),
    ("count_unscheduled", "Unscheduled"),
    ("total_unscheduled_ping_drop", "Unscheduled ping drop"),
    ("count_full_unscheduled_ping_drop", "Unscheduled drop == 1"),
    // ping_run_length
    ("init_run_fragment", "Initial drop run fragment"),
    ("final_run_fragment", "Final drop run fragment"),
    ("run_seconds", "Per-second drop runs"),
    ("run_minutes", "Per-minute drop runs"),
    // ping_latency
    ("mean_all_ping_latency", "Mean RTT, drop < 1"),
    ("deciles_all_ping_latency", "RTT deciles, drop < 1"),
    ("mean_full_ping_latency", "Mean RTT, drop == 0"),
    ("deciles_full_ping_latency", "RTT deciles, drop == 0"),
    ("stdev_full_ping_latency", "RTT standard deviation, drop == 0"),
    // usage
    ("download_usage", "Bytes downloaded"),
    ("upload_usage", "Bytes uploaded"),
];

/// Description table with identity fallback.
#[derive(Debug, Clone, Default)]
pub struct FieldDescriptions {
    entries: HashMap<String, String>,
}

impl FieldDescriptions {
    /// An empty table: every field is described by its own name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with the built-in dish field legend.
    pub fn dish() -> Self {
        let mut table = Self::new();
        for (name, text) in DISH_FIELD_DESCRIPTIONS {
            table.insert(*name, *text);
        }
        table
    }

    pub fn insert(&mut self, name: impl Into<String>, description: impl Into<String>) {
        self.entries.insert(name.into(), description.into());
    }

    /// Description for `name`, or `name` itself.
    pub fn describe<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries.get(name).map_or(name, String::as_str)
    }
}
