//! Synthetic training runs for `--demo` mode and tests.
//!
//! Every job logs `loss` and `accuracy`, each tagged `split=train` and
//! `split=test`. Loss decays exponentially at a rate set by the learning rate,
//! the test split sits a bit above train, and a small share of epochs are
//! logged twice (retried steps) to exercise aggregation.

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::store::{MemoryStore, StoredJob};
use crate::domain::{JobStatus, Point, Scalar, Timeseries};
use crate::error::AppError;

const LEARNING_RATES: [f64; 3] = [0.1, 0.03, 0.01];
const OPTIMIZERS: [&str; 2] = ["sgd", "adam"];
const STEPS_PER_EPOCH: f64 = 100.0;

/// Stored lifecycle of the n-th job, cycling. Together they hit every
/// status derivation branch.
#[derive(Debug, Clone, Copy)]
enum Lifecycle {
    Finished,
    Running,
    Stalled,
    Failed,
    Created,
    Scheduled,
    Canceled,
    NoHeartbeat,
}

const LIFECYCLES: [Lifecycle; 8] = [
    Lifecycle::Finished,
    Lifecycle::Running,
    Lifecycle::Stalled,
    Lifecycle::Failed,
    Lifecycle::Created,
    Lifecycle::Scheduled,
    Lifecycle::Canceled,
    Lifecycle::NoHeartbeat,
];

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub jobs: usize,
    pub epochs: usize,
    pub seed: u64,
    /// Probability that an epoch is logged a second time.
    pub duplicate_prob: f64,
    /// Reference time for creation times and heartbeats.
    pub now: DateTime<Utc>,
}

impl SampleConfig {
    pub fn new(seed: u64, now: DateTime<Utc>) -> Self {
        Self {
            jobs: 8,
            epochs: 30,
            seed,
            duplicate_prob: 0.1,
            now,
        }
    }
}

/// Build a store of synthetic jobs. The same config always yields the same
/// store.
pub fn generate_store(config: &SampleConfig) -> Result<MemoryStore, AppError> {
    if config.jobs == 0 {
        return Err(AppError::new(2, "Demo job count must be > 0."));
    }
    if config.epochs < 2 {
        return Err(AppError::new(2, "Demo epoch count must be >= 2."));
    }
    if !(0.0..1.0).contains(&config.duplicate_prob) {
        return Err(AppError::new(2, "Duplicate probability must be in [0, 1)."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, 0.02).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut store = MemoryStore::new(Vec::new()).with_clock(config.now);
    for i in 0..config.jobs {
        let lr = LEARNING_RATES[i % LEARNING_RATES.len()];
        let optimizer = OPTIMIZERS[(i / LEARNING_RATES.len()) % OPTIMIZERS.len()];
        let lifecycle = LIFECYCLES[i % LIFECYCLES.len()];

        let logged_epochs = match lifecycle {
            Lifecycle::Finished => config.epochs,
            Lifecycle::Created | Lifecycle::Scheduled => 0,
            Lifecycle::Failed | Lifecycle::Canceled => config.epochs / 3,
            Lifecycle::Running | Lifecycle::Stalled | Lifecycle::NoHeartbeat => config.epochs * 2 / 3,
        };

        let (status, heartbeat_age) = match lifecycle {
            Lifecycle::Finished => (JobStatus::Finished, None),
            Lifecycle::Running => (JobStatus::Running, Some(3)),
            Lifecycle::Stalled => (JobStatus::Running, Some(600)),
            Lifecycle::Failed => (JobStatus::Failed, None),
            Lifecycle::Created => (JobStatus::Created, None),
            Lifecycle::Scheduled => (JobStatus::Scheduled, None),
            Lifecycle::Canceled => (JobStatus::Canceled, None),
            Lifecycle::NoHeartbeat => (JobStatus::Running, None),
        };

        let mut job_config = IndexMap::new();
        job_config.insert("learning_rate".to_string(), Scalar::Num(lr));
        job_config.insert("optimizer".to_string(), Scalar::from(optimizer));
        job_config.insert("seed".to_string(), Scalar::Num(i as f64));

        let mut series = Vec::new();
        for (split, offset) in [("train", 0.0), ("test", 0.15)] {
            let mut loss = Vec::new();
            let mut accuracy = Vec::new();
            for epoch in 0..logged_epochs {
                let repeats = if rng.gen_bool(config.duplicate_prob) { 2 } else { 1 };
                for _ in 0..repeats {
                    let clean = 2.3 * (-(lr * 30.0).sqrt() * epoch as f64 / 4.0).exp() + 0.1 + offset;
                    let value = (clean + noise.sample(&mut rng)).max(0.01);
                    loss.push(sample_point(epoch, value));
                    let acc = (1.0 - value / 2.5 + noise.sample(&mut rng)).clamp(0.0, 1.0);
                    accuracy.push(sample_point(epoch, acc));
                }
            }
            series.push(timeseries("loss", split, loss));
            series.push(timeseries("accuracy", split, accuracy));
        }

        store.insert(StoredJob {
            id: format!("{i:02}{:06x}", rng.gen_range(0..0xff_ffff_u32)),
            experiment: "demo".to_string(),
            job: format!("{optimizer}-lr{lr}-s{i}"),
            status,
            last_heartbeat: heartbeat_age.map(|secs| config.now - Duration::seconds(secs)),
            creation_time: config.now - Duration::minutes(((config.jobs - i) * 15) as i64),
            exception: matches!(lifecycle, Lifecycle::Failed)
                .then(|| "RuntimeError: CUDA out of memory".to_string()),
            progress: Some(logged_epochs as f64 / config.epochs as f64),
            config: job_config,
            series,
        });
    }
    Ok(store)
}

fn sample_point(epoch: usize, value: f64) -> Point {
    [
        ("epoch".to_string(), Scalar::Num(epoch as f64)),
        ("step".to_string(), Scalar::Num(epoch as f64 * STEPS_PER_EPOCH)),
        ("value".to_string(), Scalar::Num(value)),
    ]
    .into_iter()
    .collect()
}

fn timeseries(measurement: &str, split: &str, values: Vec<Point>) -> Timeseries {
    Timeseries {
        measurement: measurement.to_string(),
        tags: [("split".to_string(), Scalar::from(split))].into_iter().collect(),
        values: Some(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::JobSource;
    use crate::data::query::JobQuery;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn config() -> SampleConfig {
        SampleConfig::new(7, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn same_seed_same_store() {
        assert_eq!(generate_store(&config()).unwrap(), generate_store(&config()).unwrap());
        let other = SampleConfig { seed: 8, ..config() };
        assert_ne!(generate_store(&config()).unwrap(), generate_store(&other).unwrap());
    }

    #[test]
    fn derived_statuses_cover_every_branch() {
        let store = generate_store(&config()).unwrap();
        let jobs = store.list_jobs(&JobQuery::default()).unwrap();
        let statuses: HashSet<JobStatus> = jobs.iter().map(|j| j.status).collect();
        for status in JobStatus::ALL.into_iter().filter(|s| *s != JobStatus::Queue) {
            assert!(statuses.contains(&status), "missing {status}");
        }
        let running = jobs.iter().filter(|j| j.status == JobStatus::Running).count();
        assert_eq!(running, 2);
    }

    #[test]
    fn series_carry_split_tags_and_config() {
        let store = generate_store(&config()).unwrap();
        let job = &store.jobs()[0];
        let keys: Vec<&str> = job.config.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["learning_rate", "optimizer", "seed"]);
        assert_eq!(job.series.len(), 4);
        let splits: HashSet<String> = job.series.iter().map(|s| s.tags["split"].to_string()).collect();
        assert_eq!(splits, HashSet::from(["train".to_string(), "test".to_string()]));
        assert!(job.series.iter().all(|s| s.values.as_ref().is_some_and(|v| v.len() >= 30)));
    }

    #[test]
    fn duplicates_appear_when_likely() {
        let cfg = SampleConfig { duplicate_prob: 0.5, ..config() };
        let store = generate_store(&cfg).unwrap();
        let values = store.jobs()[0].series[0].values.clone().unwrap_or_default();
        assert!(values.len() > cfg.epochs);
    }

    #[test]
    fn invalid_configs_are_usage_errors() {
        for bad in [
            SampleConfig { jobs: 0, ..config() },
            SampleConfig { epochs: 1, ..config() },
            SampleConfig { duplicate_prob: 1.0, ..config() },
        ] {
            assert_eq!(generate_store(&bad).unwrap_err().exit_code(), 2);
        }
    }
}
