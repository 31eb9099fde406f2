//! Curve flattening.
//!
//! A series query returns jobs with nested series. Charting wants the
//! opposite: one flat record per (job, series) pair carrying every property a
//! facet dimension could be bound to.

use std::collections::BTreeMap;

use indexmap::IndexMap;

use crate::domain::{ConfigEntry, JobSeries, Point, Scalar, Tags};

/// Merged property mapping of one curve, in insertion order.
pub type PropertyBag = IndexMap<String, Scalar>;

/// The part of a job a curve keeps.
#[derive(Debug, Clone, PartialEq)]
pub struct JobMeta {
    pub id: String,
    pub experiment: String,
    pub job: String,
}

/// One job's one named time series plus its property bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Stable key: job id, measurement and tag set.
    pub id: String,
    pub job: JobMeta,
    pub measurement: String,
    pub tags: Tags,
    pub values: Vec<Point>,
    pub properties: PropertyBag,
}

impl Curve {
    /// Value of a property; absent properties read as `Null`.
    pub fn property(&self, name: &str) -> &Scalar {
        static NULL: Scalar = Scalar::Null;
        self.properties.get(name).unwrap_or(&NULL)
    }
}

/// Flatten a query result into curves, one per (job, series) pair.
///
/// Nothing is deduplicated: two jobs with the same measurement give two
/// curves. Series without values give curves without points.
pub fn flatten(result: &[JobSeries]) -> Vec<Curve> {
    let mut curves = Vec::new();
    for job in result {
        let meta = JobMeta {
            id: job.id.clone(),
            experiment: job.experiment.clone(),
            job: job.job.clone(),
        };
        for series in &job.timeseries {
            let properties = property_bag(&meta, &series.measurement, &job.config, &series.tags);
            curves.push(Curve {
                id: curve_id(&meta.id, &series.measurement, &series.tags),
                job: meta.clone(),
                measurement: series.measurement.clone(),
                tags: series.tags.clone(),
                values: series.values.clone().unwrap_or_default(),
                properties,
            });
        }
    }
    curves
}

/// Merge job fields, config and tags into one bag.
///
/// Sources are applied in that order and later sources win on key collision:
/// a tag named like a config key hides the config value, and a config key
/// named `job` hides the job name.
pub fn property_bag(meta: &JobMeta, measurement: &str, config: &[ConfigEntry], tags: &Tags) -> PropertyBag {
    let mut bag = PropertyBag::new();
    bag.insert("jobId".to_string(), Scalar::from(meta.id.as_str()));
    bag.insert("job".to_string(), Scalar::from(meta.job.as_str()));
    bag.insert("experiment".to_string(), Scalar::from(meta.experiment.as_str()));
    bag.insert("measurement".to_string(), Scalar::from(measurement));
    for entry in config {
        bag.insert(entry.key.clone(), entry.value.clone());
    }
    for (key, value) in tags {
        bag.insert(key.clone(), value.clone());
    }
    bag
}

/// `job/measurement{k=v,...}` with tags in key order.
pub fn curve_id(job_id: &str, measurement: &str, tags: &BTreeMap<String, Scalar>) -> String {
    let tags: Vec<String> = tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{job_id}/{measurement}{{{}}}", tags.join(","))
}
