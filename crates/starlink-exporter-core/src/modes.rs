//! Data groups a dish feed can report.
//!
//! `status` comes from the dish's `get_status` answer; every other group is
//! computed from the `get_history` ring buffer.

use std::fmt;
use std::str::FromStr;

/// One selectable data group. The name doubles as the category tag of the
/// items the group produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    Status,
    PingDrop,
    PingRunLength,
    PingLatency,
    PingLoadedLatency,
    Usage,
}

impl Mode {
    pub const ALL: [Mode; 6] = [
        Mode::Status,
        Mode::PingDrop,
        Mode::PingRunLength,
        Mode::PingLatency,
        Mode::PingLoadedLatency,
        Mode::Usage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Status => "status",
            Mode::PingDrop => "ping_drop",
            Mode::PingRunLength => "ping_run_length",
            Mode::PingLatency => "ping_latency",
            Mode::PingLoadedLatency => "ping_loaded_latency",
            Mode::Usage => "usage",
        }
    }

    /// Whether the group is computed from history samples.
    pub fn is_history(self) -> bool {
        self != Mode::Status
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Mode::ALL.iter().map(|m| m.name()).collect();
                format!("unknown mode {s:?} (expected one of: {})", names.join(", "))
            })
    }
}

/// A set of selected groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSet(u8);

impl ModeSet {
    pub fn empty() -> Self {
        Self(0)
    }

    fn bit(mode: Mode) -> u8 {
        1 << (mode as u8)
    }

    pub fn with(mut self, mode: Mode) -> Self {
        self.0 |= Self::bit(mode);
        self
    }

    pub fn contains(&self, mode: Mode) -> bool {
        self.0 & Self::bit(mode) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if any history group is selected.
    pub fn needs_history(&self) -> bool {
        self.iter().any(Mode::is_history)
    }

    pub fn iter(&self) -> impl Iterator<Item = Mode> + '_ {
        Mode::ALL.into_iter().filter(|m| self.contains(*m))
    }
}

/// `status` only.
impl Default for ModeSet {
    fn default() -> Self {
        Self::empty().with(Mode::Status)
    }
}

impl FromIterator<Mode> for ModeSet {
    fn from_iter<I: IntoIterator<Item = Mode>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Display for ModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.iter().map(Mode::name).collect();
        f.write_str(&names.join(","))
    }
}
