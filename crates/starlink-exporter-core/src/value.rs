//! Value classification: raw feed values -> tagged metric shapes.
//!
//! The feed hands over loosely typed values (numbers, strings, booleans or
//! nothing at all). [`Classifier::classify`] resolves each one exactly once
//! into a [`MetricValue`]; everything downstream matches on that tag.

use std::fmt;

use crate::descriptions::FieldDescriptions;
use crate::state;

/// Field carrying the dish connection state. Always classified as
/// [`MetricValue::State`], whatever its raw type.
pub const STATE_FIELD: &str = "state";

/// A value as reported by the telemetry feed, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Absent,
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Absent, Into::into)
    }
}

/// Metric shape of a classified value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Exported as a gauge.
    Number(f64),
    /// Folded into the info aggregate.
    Text(String),
    /// Connection state name, exported through the state vocabulary.
    State(String),
}

impl MetricValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::State(s) => Some(s),
            Self::Number(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::State(s) => write!(f, "{s} ({})", state::state_code(s)),
        }
    }
}

/// A classified field, ready for export.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub value: MetricValue,
    /// Help text; the field name when no description is known.
    pub description: String,
    /// Upstream grouping tag (`status`, `usage`, ...). Carried, not interpreted.
    pub category: String,
}

/// Resolves raw feed values into [`FieldValue`]s.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    descriptions: FieldDescriptions,
}

impl Classifier {
    pub fn new(descriptions: FieldDescriptions) -> Self {
        Self { descriptions }
    }

    /// Classify one named value.
    ///
    /// Absent and `false` become 0, `true` becomes 1, numbers pass through and
    /// strings stay text. The `state` field is always a state: text is kept as
    /// the state name, a number is looked up by index in the vocabulary.
    pub fn classify(&self, name: &str, raw: RawValue, category: &str) -> FieldValue {
        let value = if name == STATE_FIELD {
            MetricValue::State(state_from_raw(raw))
        } else {
            match raw {
                RawValue::Number(v) => MetricValue::Number(v),
                RawValue::Text(s) => MetricValue::Text(s),
                RawValue::Bool(b) => MetricValue::Number(if b { 1.0 } else { 0.0 }),
                RawValue::Absent => MetricValue::Number(0.0),
            }
        };
        FieldValue {
            value,
            description: self.descriptions.describe(name).to_string(),
            category: category.to_string(),
        }
    }
}

fn state_from_raw(raw: RawValue) -> String {
    match raw {
        RawValue::Text(s) => s,
        RawValue::Number(v) if v >= 0.0 && v.fract() == 0.0 => state::state_name(v as usize)
            .unwrap_or(state::STATE_VOCABULARY[0])
            .to_string(),
        _ => state::STATE_VOCABULARY[0].to_string(),
    }
}
