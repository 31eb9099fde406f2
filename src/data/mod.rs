//! Job data sources.
//!
//! The chart pipeline only needs `fetchJobSeries` and the job listing, so a
//! source is anything implementing [`JobSource`]:
//!
//! - the job-monitor GraphQL API (`graphql`)
//! - an in-memory store with the same query semantics (`store`)
//! - synthetic demo runs loaded into that store (`sample`)

use crate::domain::{Job, JobSeries};
use crate::error::AppError;

pub mod graphql;
pub mod query;
pub mod sample;
pub mod status;
pub mod store;

pub use query::{JobQuery, SeriesQuery, Summary, TagCondition, summarize};

/// Read-only access to jobs and their time series.
///
/// Sources are shared with refresh worker threads, hence `Send + Sync`.
pub trait JobSource: Send + Sync {
    /// Jobs matching the query, newest first, with derived statuses.
    fn list_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, AppError>;

    /// The requested jobs with their matching series.
    fn fetch_job_series(&self, query: &SeriesQuery) -> Result<Vec<JobSeries>, AppError>;
}
