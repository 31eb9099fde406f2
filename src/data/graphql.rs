//! Job-monitor GraphQL API client.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::data::JobSource;
use crate::data::query::{JobQuery, SeriesQuery};
use crate::domain::types::null_as_default;
use crate::domain::{Job, JobSeries};
use crate::error::AppError;

pub const HOST_VAR: &str = "JOBMONITOR_GRAPHQL_HOST";
pub const PORT_VAR: &str = "JOBMONITOR_GRAPHQL_PORT";
pub const DEFAULT_PORT: u16 = 4000;

const JOBS_QUERY: &str = r#"
query Jobs($search: String, $limit: Int!, $status: Status) {
  jobs(search: $search, limit: $limit, status: $status) {
    id
    experiment
    job
    status
    exception
    progress
    creationTime
  }
}"#;

const JOB_SERIES_QUERY: &str = r#"
query JobSeries($ids: [ID], $measurement: String, $tags: String) {
  jobs(ids: $ids) {
    id
    experiment
    job
    config {
      key
      value
    }
    timeseries(measurement: $measurement, tags: $tags) {
      measurement
      tags
      values
    }
  }
}"#;

pub struct GraphqlClient {
    client: Client,
    endpoint: String,
}

impl GraphqlClient {
    /// Build the client from `JOBMONITOR_GRAPHQL_HOST` / `JOBMONITOR_GRAPHQL_PORT`
    /// (a `.env` file is honoured).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let host = std::env::var(HOST_VAR)
            .map_err(|_| AppError::new(2, format!("Missing {HOST_VAR} in environment (.env). Use --demo for sample data.")))?;
        let port = match std::env::var(PORT_VAR) {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| AppError::new(2, format!("Invalid {PORT_VAR} '{raw}': {e}")))?,
            Err(_) => DEFAULT_PORT,
        };
        Ok(Self::new(endpoint_url(&host, port)))
    }

    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, AppError> {
        debug!(endpoint = %self.endpoint, "posting GraphQL query");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .map_err(|e| AppError::new(4, format!("GraphQL request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("GraphQL request failed with status {}.", resp.status()),
            ));
        }

        let text = resp
            .text()
            .map_err(|e| AppError::new(4, format!("Failed to read GraphQL response: {e}")))?;
        decode(&text)
    }
}

impl JobSource for GraphqlClient {
    fn list_jobs(&self, query: &JobQuery) -> Result<Vec<Job>, AppError> {
        let data: JobsData<Job> = self.post(
            JOBS_QUERY,
            json!({ "search": query.search_pattern(), "limit": query.limit, "status": query.status }),
        )?;
        Ok(data.jobs)
    }

    fn fetch_job_series(&self, query: &SeriesQuery) -> Result<Vec<JobSeries>, AppError> {
        let data: JobsData<JobSeries> = self.post(
            JOB_SERIES_QUERY,
            json!({
                "ids": query.job_ids,
                "measurement": query.measurement_pattern(),
                "tags": query.tag_filter(),
            }),
        )?;
        Ok(data.jobs)
    }
}

/// `http://host:port/graphql`; port 443 selects https. A host that already
/// carries a scheme keeps it.
pub fn endpoint_url(host: &str, port: u16) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        return format!("{host}:{port}/graphql");
    }
    let scheme = if port == 443 { "https" } else { "http" };
    format!("{scheme}://{host}:{port}/graphql")
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct JobsData<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    jobs: Vec<T>,
}

/// Unwrap a GraphQL response envelope. Reported errors win over partial data.
fn decode<T: DeserializeOwned>(text: &str) -> Result<T, AppError> {
    let body: GraphqlResponse<T> = serde_json::from_str(text)
        .map_err(|e| AppError::new(4, format!("Failed to parse GraphQL response: {e}")))?;
    if !body.errors.is_empty() {
        let messages: Vec<&str> = body.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(AppError::new(4, format!("GraphQL error: {}", messages.join("; "))));
    }
    body.data
        .ok_or_else(|| AppError::new(4, "GraphQL response carried no data."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobStatus;

    #[test]
    fn endpoint_scheme_follows_port() {
        assert_eq!(endpoint_url("localhost", 4000), "http://localhost:4000/graphql");
        assert_eq!(endpoint_url("jobs.example.org", 443), "https://jobs.example.org:443/graphql");
        assert_eq!(endpoint_url("https://jobs.example.org/", 8443), "https://jobs.example.org:8443/graphql");
    }

    #[test]
    fn decodes_job_listing() {
        let text = r#"{"data": {"jobs": [
            {"id": "1", "experiment": "e", "job": "a", "status": "RUNNING",
             "exception": null, "progress": 0.25, "creationTime": 1546300800000}
        ]}}"#;
        let data: JobsData<Job> = decode(text).unwrap();
        assert_eq!(data.jobs.len(), 1);
        assert_eq!(data.jobs[0].status, JobStatus::Running);
    }

    #[test]
    fn null_job_list_is_empty() {
        let data: JobsData<JobSeries> = decode(r#"{"data": {"jobs": null}}"#).unwrap();
        assert!(data.jobs.is_empty());
    }

    #[test]
    fn series_values_keep_heterogeneous_fields() {
        let text = r#"{"data": {"jobs": [{
            "id": "1", "experiment": "e", "job": "a",
            "config": [{"key": "lr", "value": 0.1}, {"key": "optimizer", "value": "sgd"}],
            "timeseries": [{"measurement": "loss", "tags": {"split": "train"},
                            "values": [{"epoch": 0, "value": 1.5, "time": 1546300800000}]}]
        }]}}"#;
        let data: JobsData<JobSeries> = decode(text).unwrap();
        let series = &data.jobs[0].timeseries[0];
        let values = series.values.as_ref().unwrap();
        assert_eq!(values[0]["value"].as_f64(), Some(1.5));
        assert_eq!(data.jobs[0].config[1].value.to_string(), "sgd");
    }

    #[test]
    fn errors_become_upstream_failures() {
        let err = decode::<JobsData<Job>>(r#"{"data": null, "errors": [{"message": "boom"}]}"#).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(err.message().contains("boom"));
        assert_eq!(decode::<JobsData<Job>>("not json").unwrap_err().exit_code(), 4);
        assert_eq!(decode::<JobsData<Job>>(r#"{"data": null}"#).unwrap_err().exit_code(), 4);
    }
}
