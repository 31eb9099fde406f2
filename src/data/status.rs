//! Job status derivation.
//!
//! A stored `RUNNING` status only means the worker has not reported an end
//! yet. Whether it is still alive follows from the heartbeat it writes every
//! `HEARTBEAT_INTERVAL_SECS`.

use chrono::{DateTime, Duration, Utc};

use crate::domain::JobStatus;

pub const HEARTBEAT_INTERVAL_SECS: i64 = 10;

/// Status shown to the user.
///
/// `RUNNING` with a heartbeat older than two intervals becomes
/// `UNRESPONSIVE`. A job that never wrote a heartbeat stays `RUNNING`.
pub fn derive_status(stored: JobStatus, last_heartbeat: Option<DateTime<Utc>>, now: DateTime<Utc>) -> JobStatus {
    match (stored, last_heartbeat) {
        (JobStatus::Running, Some(beat)) if now - beat > Duration::seconds(2 * HEARTBEAT_INTERVAL_SECS) => {
            JobStatus::Unresponsive
        }
        (status, _) => status,
    }
}

/// Whether a derived status passes a status filter.
///
/// `QUEUE` stands for everything not yet done: running, created, scheduled.
pub fn matches_filter(derived: JobStatus, filter: Option<JobStatus>) -> bool {
    match filter {
        None => true,
        Some(JobStatus::Queue) => matches!(
            derived,
            JobStatus::Running | JobStatus::Created | JobStatus::Scheduled
        ),
        Some(wanted) => derived == wanted,
    }
}

/// Coarse class of a status for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Pending,
    Active,
    Neutral,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Ok => "ok",
            Severity::Pending => "pending",
            Severity::Active => "active",
            Severity::Neutral => "neutral",
            Severity::Error => "error",
        }
    }
}

pub fn severity(status: JobStatus) -> Severity {
    match status {
        JobStatus::Finished => Severity::Ok,
        JobStatus::Created | JobStatus::Queue | JobStatus::Scheduled => Severity::Pending,
        JobStatus::Running => Severity::Active,
        JobStatus::Canceled => Severity::Neutral,
        JobStatus::Failed | JobStatus::Unresponsive => Severity::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn stale_heartbeat_means_unresponsive() {
        let stale = now() - Duration::seconds(21);
        let fresh = now() - Duration::seconds(20);
        assert_eq!(derive_status(JobStatus::Running, Some(stale), now()), JobStatus::Unresponsive);
        assert_eq!(derive_status(JobStatus::Running, Some(fresh), now()), JobStatus::Running);
    }

    #[test]
    fn missing_heartbeat_stays_running() {
        assert_eq!(derive_status(JobStatus::Running, None, now()), JobStatus::Running);
    }

    #[test]
    fn other_statuses_ignore_the_heartbeat() {
        let stale = now() - Duration::hours(5);
        for status in [JobStatus::Finished, JobStatus::Failed, JobStatus::Created, JobStatus::Canceled] {
            assert_eq!(derive_status(status, Some(stale), now()), status);
        }
    }

    #[test]
    fn queue_filter_covers_pending_and_running() {
        let queue = Some(JobStatus::Queue);
        assert!(matches_filter(JobStatus::Running, queue));
        assert!(matches_filter(JobStatus::Scheduled, queue));
        assert!(matches_filter(JobStatus::Created, queue));
        assert!(!matches_filter(JobStatus::Unresponsive, queue));
        assert!(!matches_filter(JobStatus::Finished, queue));
        assert!(matches_filter(JobStatus::Failed, None));
        assert!(matches_filter(JobStatus::Failed, Some(JobStatus::Failed)));
        assert!(!matches_filter(JobStatus::Running, Some(JobStatus::Unresponsive)));
    }

    #[test]
    fn every_status_has_a_severity() {
        for status in JobStatus::ALL {
            let _ = severity(status).label();
        }
        assert_eq!(severity(JobStatus::Unresponsive), Severity::Error);
        assert_eq!(severity(JobStatus::Finished).label(), "ok");
    }
}
