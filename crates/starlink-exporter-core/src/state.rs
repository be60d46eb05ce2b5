//! Connection state vocabulary for the `starlink_status` family.
//!
//! States are exported as their index in [`STATE_VOCABULARY`]; the legend is
//! embedded in the family's help text so a dashboard can decode the number.

/// Sentinel state synthesized when the dish cannot be reached.
pub const NO_CONNECTION: &str = "NO_CONNECTION_WITH_DISH";

/// Ordered state names. The position of a name is its exported code.
pub const STATE_VOCABULARY: &[&str] = &[
    "UNKNOWN",
    "CONNECTED",
    "BOOTING",
    "SEARCHING",
    "STOWED",
    "THERMAL_SHUTDOWN",
    "NO_SATS",
    "OBSTRUCTED",
    "NO_DOWNLINK",
    "NO_PINGS",
    NO_CONNECTION,
];

/// Code for `name`, or 0 (`UNKNOWN`) if the dish reports a state we do not know.
pub fn state_code(name: &str) -> usize {
    STATE_VOCABULARY
        .iter()
        .position(|s| *s == name)
        .unwrap_or_else(|| {
            log::debug!("unrecognized dish state {name:?}, exporting as UNKNOWN");
            0
        })
}

/// Name for a numeric code, if it is in range.
pub fn state_name(code: usize) -> Option<&'static str> {
    STATE_VOCABULARY.get(code).copied()
}

/// Human-readable legend, e.g. `0=UNKNOWN, 1=CONNECTED, ...`.
pub fn legend() -> String {
    STATE_VOCABULARY
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{i}={s}"))
        .collect::<Vec<_>>()
        .join(", ")
}
