//! In-memory job store.
//!
//! Holds job documents the way the database does (stored status, heartbeat,
//! raw series) and answers queries with the same semantics as the API:
//! derived statuses, name search, newest first, tag and measurement filters.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::debug;

use crate::data::query::{JobQuery, SeriesQuery};
use crate::data::status::{derive_status, matches_filter};
use crate::data::JobSource;
use crate::domain::{ConfigEntry, Job, JobSeries, JobStatus, Scalar, Timeseries};
use crate::error::AppError;

/// A job document as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredJob {
    pub id: String,
    pub experiment: String,
    pub job: String,
    pub status: JobStatus,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub creation_time: DateTime<Utc>,
    pub exception: Option<String>,
    pub progress: Option<f64>,
    pub config: IndexMap<String, Scalar>,
    pub series: Vec<Timeseries>,
}

impl StoredJob {
    pub fn to_job(&self, now: DateTime<Utc>) -> Job {
        Job {
            id: self.id.clone(),
            experiment: self.experiment.clone(),
            job: self.job.clone(),
            status: derive_status(self.status, self.last_heartbeat, now),
            exception: self.exception.clone(),
            progress: self.progress,
            creation_time: Some(self.creation_time),
        }
    }

    fn config_entries(&self) -> Vec<ConfigEntry> {
        self.config
            .iter()
            .map(|(key, value)| ConfigEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemoryStore {
    jobs: Vec<StoredJob>,
    /// Fixed "now" for status derivation; the wall clock when unset.
    clock: Option<DateTime<Utc>>,
}

impl MemoryStore {
    pub fn new(jobs: Vec<StoredJob>) -> Self {
        Self { jobs, clock: None }
    }

    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn insert(&mut self, job: StoredJob) {
        self.jobs.push(job);
    }

    pub fn jobs(&self) -> &[StoredJob] {
        &self.jobs
    }

    pub fn job_ids(&self) -> Vec<String> {
        self.jobs.iter().map(|j| j.id.clone()).collect()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }
}

impl JobSource for MemoryStore {
    fn list_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, AppError> {
        let now = self.now();
        let needle = query.name_filter.to_lowercase();
        let mut matching: Vec<&StoredJob> = self
            .jobs
            .iter()
            .filter(|j| {
                needle.is_empty()
                    || j.job.to_lowercase().contains(&needle)
                    || j.experiment.to_lowercase().contains(&needle)
            })
            .filter(|j| matches_filter(derive_status(j.status, j.last_heartbeat, now), query.status))
            .collect();
        matching.sort_by(|a, b| b.creation_time.cmp(&a.creation_time));
        if query.limit > 0 {
            matching.truncate(query.limit);
        }
        debug!(count = matching.len(), "listed jobs from memory store");
        Ok(matching.into_iter().map(|j| j.to_job(now)).collect())
    }

    fn fetch_job_series(&self, query: &SeriesQuery) -> Result<Vec<JobSeries>, AppError> {
        let out: Vec<JobSeries> = query
            .job_ids
            .iter()
            .filter_map(|id| self.jobs.iter().find(|j| j.id == *id))
            .map(|j| JobSeries {
                id: j.id.clone(),
                experiment: j.experiment.clone(),
                job: j.job.clone(),
                config: j.config_entries(),
                timeseries: j
                    .series
                    .iter()
                    .filter(|s| query.matches_measurement(&s.measurement) && query.matches_tags(&s.tags))
                    .cloned()
                    .collect(),
            })
            .collect();
        debug!(jobs = out.len(), "fetched series from memory store");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::query::parse_tag_filter;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn series(measurement: &str, split: &str) -> Timeseries {
        Timeseries {
            measurement: measurement.to_string(),
            tags: [("split".to_string(), Scalar::from(split))].into_iter().collect(),
            values: Some(vec![]),
        }
    }

    fn stored(id: &str, experiment: &str, status: JobStatus, age_hours: i64, heartbeat_secs: Option<i64>) -> StoredJob {
        StoredJob {
            id: id.to_string(),
            experiment: experiment.to_string(),
            job: format!("job-{id}"),
            status,
            last_heartbeat: heartbeat_secs.map(|s| now() - Duration::seconds(s)),
            creation_time: now() - Duration::hours(age_hours),
            exception: None,
            progress: None,
            config: [("lr".to_string(), Scalar::Num(0.1))].into_iter().collect(),
            series: vec![series("loss", "train"), series("loss", "test"), series("accuracy", "test")],
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            stored("a", "resnet", JobStatus::Finished, 5, None),
            stored("b", "resnet", JobStatus::Running, 1, Some(5)),
            stored("c", "vgg", JobStatus::Running, 3, Some(60)),
            stored("d", "vgg", JobStatus::Created, 2, None),
        ])
        .with_clock(now())
    }

    #[test]
    fn listing_is_newest_first_with_derived_status() {
        let jobs = store().list_jobs(&JobQuery::default()).unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "c", "a"]);
        assert_eq!(jobs[2].status, JobStatus::Unresponsive);
        assert_eq!(jobs[0].status, JobStatus::Running);
    }

    #[test]
    fn listing_filters_and_limits() {
        let s = store();
        let vgg = s
            .list_jobs(&JobQuery { name_filter: "VGG".to_string(), ..JobQuery::default() })
            .unwrap();
        assert_eq!(vgg.len(), 2);

        let queued = s
            .list_jobs(&JobQuery { status: Some(JobStatus::Queue), ..JobQuery::default() })
            .unwrap();
        let ids: Vec<&str> = queued.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d"]);

        let limited = s.list_jobs(&JobQuery { limit: 1, ..JobQuery::default() }).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn series_fetch_filters_measurements_and_tags() {
        let query = SeriesQuery {
            job_ids: vec!["c".to_string(), "missing".to_string(), "a".to_string()],
            measurements: vec!["loss".to_string()],
            tags: parse_tag_filter("split=test").unwrap(),
        };
        let result = store().fetch_job_series(&query).unwrap();
        let ids: Vec<&str> = result.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
        for job in &result {
            assert_eq!(job.timeseries.len(), 1);
            assert_eq!(job.timeseries[0].measurement, "loss");
            assert_eq!(job.config[0].key, "lr");
        }
    }

    #[test]
    fn no_measurements_means_no_series() {
        let query = SeriesQuery {
            job_ids: vec!["a".to_string()],
            ..SeriesQuery::default()
        };
        let result = store().fetch_job_series(&query).unwrap();
        assert!(result[0].timeseries.is_empty());
    }
}
