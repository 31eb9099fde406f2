//! Shared domain types.
//!
//! The job-monitor API hands out loosely typed JSON: config values, tags and
//! point fields can be strings, numbers, booleans or missing. These types pin
//! that shape down so the rest of the crate can work with plain Rust values:
//!
//! - `Scalar`: one heterogeneous value (config value, tag, point field)
//! - `Job` / `JobStatus`: job metadata as listed by the API
//! - `JobSeries` / `Timeseries`: the result shape of a series query

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Field holding the x coordinate of a point unless configured otherwise.
pub const DEFAULT_X_FIELD: &str = "epoch";
/// Field holding the y coordinate of a point unless configured otherwise.
pub const DEFAULT_Y_FIELD: &str = "value";

/// Lifecycle state of a training job.
///
/// `Queue` never appears on a stored job. It only exists as a filter that
/// groups every job still waiting or working (see `data::status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Created,
    Queue,
    Scheduled,
    Running,
    Finished,
    Canceled,
    Failed,
    Unresponsive,
}

impl JobStatus {
    pub const ALL: [JobStatus; 8] = [
        JobStatus::Created,
        JobStatus::Queue,
        JobStatus::Scheduled,
        JobStatus::Running,
        JobStatus::Finished,
        JobStatus::Canceled,
        JobStatus::Failed,
        JobStatus::Unresponsive,
    ];

    /// Lower-case label for terminal output.
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Queue => "queue",
            JobStatus::Scheduled => "scheduled",
            JobStatus::Running => "running",
            JobStatus::Finished => "finished",
            JobStatus::Canceled => "canceled",
            JobStatus::Failed => "failed",
            JobStatus::Unresponsive => "unresponsive",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A heterogeneous scalar value.
///
/// Ordering is lexicographic on the display form (so `"10" < "9"`), with the
/// variant and then the numeric value as tie-breakers. This is the order used
/// for every categorical domain, which is what keeps colour and dash
/// assignment deterministic.
#[derive(Debug, Clone)]
pub enum Scalar {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
}

impl Scalar {
    /// Numeric value, if this is a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Num(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    fn rank(&self) -> u8 {
        match self {
            Scalar::Null => 0,
            Scalar::Bool(_) => 1,
            Scalar::Num(_) => 2,
            Scalar::Str(_) => 3,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Num(v) => write!(f, "{v}"),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string()
            .cmp(&other.to_string())
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| match (self, other) {
                (Scalar::Num(a), Scalar::Num(b)) => a.total_cmp(b),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scalar {}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Num(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<serde_json::Value> for Scalar {
    /// Arrays and objects are kept as their JSON text, the way the API's
    /// `Object` scalar serializes them.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Scalar::Null,
            serde_json::Value::Bool(b) => Scalar::Bool(b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Scalar::Num)
                .unwrap_or_else(|| Scalar::Str(n.to_string())),
            serde_json::Value::String(s) => Scalar::Str(s),
            other => Scalar::Str(other.to_string()),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Num(v) => serializer.serialize_f64(*v),
            Scalar::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Scalar::from)
    }
}

/// One sample of a time series: field name -> value.
///
/// Always meant to carry the x field (`epoch`) and the y field (`value`), but
/// nothing upstream guarantees it.
pub type Point = BTreeMap<String, Scalar>;

/// Tag set identifying a series within a job.
pub type Tags = BTreeMap<String, Scalar>;

/// A config (or annotation) entry as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    #[serde(default = "null_scalar")]
    pub value: Scalar,
}

fn null_scalar() -> Scalar {
    Scalar::Null
}

/// A named time series of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeseries {
    pub measurement: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Tags,
    /// `None` when the API could not produce the values (partial failure).
    #[serde(default)]
    pub values: Option<Vec<Point>>,
}

/// One job of a series query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSeries {
    pub id: String,
    #[serde(default)]
    pub experiment: String,
    #[serde(default)]
    pub job: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: Vec<ConfigEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timeseries: Vec<Timeseries>,
}

/// Job metadata as shown in the job listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    #[serde(default)]
    pub experiment: String,
    #[serde(default)]
    pub job: String,
    pub status: JobStatus,
    #[serde(default)]
    pub exception: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub creation_time: Option<DateTime<Utc>>,
}

/// GraphQL happily returns `null` for list fields; treat that as empty.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_order_is_lexicographic_on_display() {
        let mut values = vec![
            Scalar::Num(9.0),
            Scalar::Num(10.0),
            Scalar::from("adam"),
            Scalar::Bool(true),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Scalar::Num(10.0),
                Scalar::Num(9.0),
                Scalar::from("adam"),
                Scalar::Bool(true),
            ]
        );
    }

    #[test]
    fn scalar_equality_distinguishes_variants_with_same_text() {
        assert_ne!(Scalar::from("1"), Scalar::Num(1.0));
        assert_ne!(Scalar::from("true"), Scalar::Bool(true));
        assert_eq!(Scalar::Num(0.5), Scalar::Num(0.5));
    }

    #[test]
    fn scalar_deserializes_objects_as_json_text() {
        let value: Scalar = serde_json::from_str(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, Scalar::from(r#"{"a":1}"#));
        let value: Scalar = serde_json::from_str("null").unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn job_series_tolerates_null_lists() {
        let raw = r#"{
            "id": "j1",
            "experiment": "exp",
            "job": "run",
            "config": null,
            "timeseries": [{"measurement": "loss", "tags": null, "values": null}]
        }"#;
        let parsed: JobSeries = serde_json::from_str(raw).unwrap();
        assert!(parsed.config.is_empty());
        assert_eq!(parsed.timeseries.len(), 1);
        assert!(parsed.timeseries[0].tags.is_empty());
        assert!(parsed.timeseries[0].values.is_none());
    }

    #[test]
    fn job_parses_graphql_shape() {
        let raw = r#"{"id": "j1", "experiment": "e", "job": "r", "status": "UNRESPONSIVE",
                      "exception": null, "progress": 0.5, "creationTime": 1546300800000}"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        assert_eq!(job.status, JobStatus::Unresponsive);
        assert_eq!(job.progress, Some(0.5));
        assert_eq!(job.creation_time.map(|t| t.timestamp()), Some(1_546_300_800));
    }
}
