use std::fmt::{self, Write};
use std::str::FromStr;

use thiserror::Error;

/// An error used when parsing a [`MetricKind`] from its type marker.
#[derive(Debug, Error)]
#[error("invalid metric kind")]
pub struct ParseMetricKindError;

/// The measurement kinds of the line protocol.
///
/// Each kind maps to a one or two letter type marker in the rendered
/// line, in the statsd/dogstatsd dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// A counter delta (`c`).
    Count,
    /// An instantaneous value (`g`).
    Gauge,
    /// A sampled distribution value (`h`).
    Histogram,
    /// A duration in milliseconds (`ms`).
    Timing,
    /// A unique-member observation (`s`).
    Set,
}

impl MetricKind {
    /// The type marker used in the rendered line.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Count => "c",
            MetricKind::Gauge => "g",
            MetricKind::Histogram => "h",
            MetricKind::Timing => "ms",
            MetricKind::Set => "s",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = ParseMetricKindError;

    fn from_str(s: &str) -> Result<MetricKind, Self::Err> {
        Ok(match s {
            "c" => MetricKind::Count,
            "g" => MetricKind::Gauge,
            "h" => MetricKind::Histogram,
            "ms" => MetricKind::Timing,
            "s" => MetricKind::Set,
            _ => return Err(ParseMetricKindError),
        })
    }
}

/// A measurement value as it appears after the `:` in a rendered line.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// An integer value, rendered without a decimal point.
    Int(i64),
    /// A float value, rendered with up to six fractional digits and
    /// trailing zeros trimmed. `NaN` renders as `NaN`.
    Float(f64),
    /// A verbatim string value, used for set members.
    Text(Box<str>),
}

impl MetricValue {
    pub(crate) fn write_to(&self, out: &mut String) {
        match self {
            MetricValue::Int(value) => {
                let _ = write!(out, "{value}");
            }
            MetricValue::Float(value) => {
                if value.is_nan() {
                    out.push_str("NaN");
                    return;
                }
                let start = out.len();
                let _ = write!(out, "{value:.6}");
                if out[start..].contains('.') {
                    let kept = out[start..].trim_end_matches('0').trim_end_matches('.').len();
                    out.truncate(start + kept);
                }
            }
            MetricValue::Text(value) => out.push_str(value),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> MetricValue {
        MetricValue::Int(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> MetricValue {
        MetricValue::Float(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> MetricValue {
        MetricValue::Text(value.into())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> MetricValue {
        MetricValue::Text(value.into())
    }
}

/// Renders one protocol line into `out`, without a trailing newline.
///
/// `prefix` must already carry its trailing `.` when non-empty. Constant
/// tags come before per-measurement tags and the tag section is omitted
/// entirely when both are empty.
pub(crate) fn render_line(
    out: &mut String,
    prefix: &str,
    metric: &str,
    value: &MetricValue,
    kind: MetricKind,
    constant_tags: &[String],
    tags: &[String],
) {
    out.push_str(prefix);
    out.push_str(metric);
    out.push(':');
    value.write_to(out);
    out.push('|');
    out.push_str(kind.as_str());
    if !constant_tags.is_empty() || !tags.is_empty() {
        out.push_str("|#");
        let mut first = true;
        for tag in constant_tags.iter().chain(tags) {
            if !first {
                out.push(',');
            }
            out.push_str(tag);
            first = false;
        }
    }
}
