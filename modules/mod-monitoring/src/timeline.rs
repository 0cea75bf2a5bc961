//! Samples and the windowing rules used to chart them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Attribute key grouping disk samples.
pub const FILESYSTEM: &str = "filesystem";
/// Group used for disk samples without a filesystem attribute.
pub const UNKNOWN_FILESYSTEM: &str = "unknown";

const LOAD_KEYS: [&str; 3] = ["load1", "load5", "load15"];

/// One timestamped observation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub attributes: BTreeMap<String, String>,
}

impl Sample {
    /// Builds a sample from a raw monitoring point, reading the measurement from `value_key`.
    /// Points without a usable timestamp or measurement yield `None`.
    pub fn from_point(point: &Value, value_key: &str) -> Option<Sample> {
        let object = point.as_object()?;
        let timestamp = parse_timestamp(object.get("timestamp")?)?;
        let value = number(object.get(value_key)?)?;

        let attributes = object
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "type" | "timestamp") && *key != value_key)
            .filter_map(|(key, value)| scalar_text(value).map(|text| (key.clone(), text)))
            .collect();

        Some(Sample {
            timestamp,
            value,
            attributes,
        })
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attribute(key)?.parse().ok()
    }
}

/// Converts raw points into samples, dropping unusable ones.
pub fn samples(points: &[Value], value_key: &str) -> Vec<Sample> {
    let samples: Vec<Sample> = points
        .iter()
        .filter_map(|point| Sample::from_point(point, value_key))
        .collect();
    let dropped = points.len() - samples.len();
    if dropped > 0 {
        tracing::debug!(dropped, value_key, "skipped malformed monitoring points");
    }
    samples
}

/// The last `n` samples in their original order.
pub fn window(series: &[Sample], n: usize) -> &[Sample] {
    &series[series.len().saturating_sub(n)..]
}

/// The most recent sample.
pub fn headline(series: &[Sample]) -> Option<&Sample> {
    series.last()
}

/// Partitions samples by filesystem, keeping groups in first-seen order.
pub fn group_by_filesystem(series: &[Sample]) -> Vec<(String, Vec<Sample>)> {
    let mut groups: Vec<(String, Vec<Sample>)> = Vec::new();
    for sample in series {
        let key = sample.attribute(FILESYSTEM).unwrap_or(UNKNOWN_FILESYSTEM);
        match groups.iter_mut().find(|(name, _)| name == key) {
            Some((_, members)) => members.push(sample.clone()),
            None => groups.push((key.to_string(), vec![sample.clone()])),
        }
    }
    groups
}

/// Shared vertical scale of a load chart.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct LoadScale {
    pub max: f64,
    pub cores: Option<f64>,
}

/// Highest of every load component in `window` and the core count of its first sample.
pub fn load_scale(window: &[Sample]) -> Option<LoadScale> {
    let first = window.first()?;
    let cores = first.attribute_f64("cores");

    let max = window
        .iter()
        .flat_map(load_components)
        .chain(cores)
        .fold(f64::MIN, f64::max);

    Some(LoadScale { max, cores })
}

/// The 1, 5 and 15 minute loads of a sample; `value` stands in for load1.
pub fn load_components(sample: &Sample) -> [f64; 3] {
    let mut components = [sample.value; 3];
    for (slot, key) in components.iter_mut().zip(LOAD_KEYS).skip(1) {
        *slot = sample.attribute_f64(key).unwrap_or(0.0);
    }
    components
}

/// Height of `value` as a percentage of `scale`, zero when the scale is empty.
pub fn height(value: f64, scale: f64) -> f64 {
    if scale > 0.0 {
        value / scale * 100.0
    } else {
        0.0
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Some(parsed.with_timezone(&Utc));
            }
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|naive| naive.and_utc())
        }
        Value::Number(number) => DateTime::from_timestamp(number.as_i64()?, 0),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|value| value.is_finite())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
