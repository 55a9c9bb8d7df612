use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Job, JobId};
use crate::workflows::store::RepositoryError;

/// Repository record pairing a job with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    pub job: Job,
    pub version: u64,
}

impl JobRecord {
    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.job.id.clone(),
            status: self.job.status.label(),
            sla_due_at: self.job.sla_due_at,
            assigned_appraiser_id: self.job.assigned_appraiser_id.clone(),
            version: self.version,
        }
    }
}

/// Storage abstraction for the job store; the single owner of job mutation.
///
/// `update` is a conditional write: the record's `version` must match the
/// stored version or the call fails with `RepositoryError::VersionConflict`,
/// and the stored version is bumped on success. History entries therefore
/// observe strict per-job commit order.
pub trait JobRepository: Send + Sync {
    fn insert(&self, job: Job) -> Result<JobRecord, RepositoryError>;
    fn fetch(&self, id: &JobId) -> Result<Option<JobRecord>, RepositoryError>;
    fn update(&self, record: JobRecord) -> Result<JobRecord, RepositoryError>;
    /// Jobs not yet in a terminal status, for breach sweeps.
    fn active(&self) -> Result<Vec<JobRecord>, RepositoryError>;
}

/// Payout-eligibility collaborator invoked once per approved job.
pub trait PayoutGateway: Send + Sync {
    fn create_payout(&self, request: PayoutRequest) -> Result<PayoutId, PayoutError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutRequest {
    pub job_id: JobId,
    pub appraiser_id: String,
    pub amount_cents: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutId(pub String);

#[derive(Debug, thiserror::Error)]
pub enum PayoutError {
    #[error("payout collaborator unavailable: {0}")]
    Transport(String),
    #[error("payout rejected: {0}")]
    Rejected(String),
}

/// Sanitized job summary returned from mutation endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla_due_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_appraiser_id: Option<String>,
    pub version: u64,
}

impl From<&JobRecord> for JobStatusView {
    fn from(record: &JobRecord) -> Self {
        record.status_view()
    }
}
