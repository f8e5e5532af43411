//! Metrics for pool observability.
//!
//! Recorded through the `metrics` facade; the embedding application
//! decides which exporter to install.

use metrics::{counter, histogram};
use std::time::Duration;

/// Metric names as constants for consistency
pub mod names {
    pub const JOBS_PROCESSED: &str = "pool_jobs_processed_total";
    pub const JOB_DURATION: &str = "pool_job_duration_seconds";
}

/// Job outcome for metrics labeling
#[derive(Debug, Clone, Copy)]
pub enum JobStatus {
    Success,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Record a job as processed with the given outcome.
pub fn record_job_processed(kind: &str, status: JobStatus) {
    counter!(
        names::JOBS_PROCESSED,
        "job" => kind.to_string(),
        "status" => status.as_str().to_string()
    )
    .increment(1);
}

/// Record how long one job took from dispatch to outcome.
pub fn record_job_duration(kind: &str, elapsed: Duration) {
    histogram!(names::JOB_DURATION, "job" => kind.to_string()).record(elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(JobStatus::Success.as_str(), "success");
        assert_eq!(JobStatus::Failed.as_str(), "failed");
        assert_eq!(JobStatus::TimedOut.as_str(), "timed_out");
    }
}
