//! Best-effort batch transitions over sets of jobs.
//!
//! One failing item never aborts the rest of the batch: every job is
//! attempted independently and the outcome reports, per job, either success
//! or a typed failure. An admin cancelling twenty jobs of which three are
//! already terminal gets seventeen cancellations and three recorded skips.

use std::sync::Arc;

use serde::Serialize;

use super::domain::{Actor, JobId, JobStatus};
use super::repository::{JobRepository, PayoutGateway, PayoutRequest};
use super::service::{JobLifecycleService, JobWorkflowError, TransitionCommand};
use crate::workflows::notify::NotificationGateway;

/// Why one job in a batch did not (fully) go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkFailureKind {
    NotFound,
    ValidationError,
    IllegalTransition,
    ConcurrencyConflict,
    StoreUnavailable,
    /// The job reached `completed`, but the payout collaborator refused the
    /// eligibility record; the payout needs a manual retry.
    PayoutCreationFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkFailure {
    pub job_id: JobId,
    pub kind: BulkFailureKind,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkCancelOutcome {
    pub processed: usize,
    pub cancelled: usize,
    pub failures: Vec<BulkFailure>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkApproveOutcome {
    pub processed: usize,
    pub approved: usize,
    pub failures: Vec<BulkFailure>,
}

/// Applies one transition to many jobs with per-item failure isolation.
pub struct BulkOperationCoordinator<R, N, P> {
    service: Arc<JobLifecycleService<R, N>>,
    payouts: Arc<P>,
}

impl<R, N, P> BulkOperationCoordinator<R, N, P>
where
    R: JobRepository + 'static,
    N: NotificationGateway + 'static,
    P: PayoutGateway + 'static,
{
    pub fn new(service: Arc<JobLifecycleService<R, N>>, payouts: Arc<P>) -> Self {
        Self { service, payouts }
    }

    /// Cancel every listed job. Fails fast with a validation error when the
    /// reason is empty, since no job could ever be cancelled without one;
    /// afterwards `cancelled + failures.len() == processed` holds exactly.
    pub fn bulk_cancel(
        &self,
        job_ids: &[JobId],
        reason: &str,
        actor: &Actor,
    ) -> Result<BulkCancelOutcome, JobWorkflowError> {
        if reason.trim().is_empty() {
            return Err(JobWorkflowError::Validation(
                "bulk cancel requires a non-empty reason".to_string(),
            ));
        }

        let mut outcome = BulkCancelOutcome::default();
        let command = TransitionCommand::cancel(actor.clone(), reason);

        for job_id in job_ids {
            outcome.processed += 1;
            match self.service.transition(job_id, &command) {
                Ok(_) => outcome.cancelled += 1,
                Err(err) => outcome.failures.push(failure(job_id, &err)),
            }
        }

        Ok(outcome)
    }

    /// Approve every listed job, creating one payout-eligibility record per
    /// approval. A payout failure is reported distinctly: the job still
    /// counts as approved (its status did change to `completed`), and the
    /// failure entry flags the record for retry.
    pub fn bulk_approve(
        &self,
        job_ids: &[JobId],
        notes: Option<&str>,
        actor: &Actor,
    ) -> BulkApproveOutcome {
        let mut outcome = BulkApproveOutcome::default();
        let mut command = TransitionCommand::new(JobStatus::Completed, actor.clone());
        command.reason = notes
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .map(str::to_string);

        for job_id in job_ids {
            outcome.processed += 1;
            let record = match self.service.transition(job_id, &command) {
                Ok(record) => record,
                Err(err) => {
                    outcome.failures.push(failure(job_id, &err));
                    continue;
                }
            };

            outcome.approved += 1;

            let appraiser_id = match record.job.assigned_appraiser_id.clone() {
                Some(appraiser_id) => appraiser_id,
                None => {
                    outcome.failures.push(BulkFailure {
                        job_id: job_id.clone(),
                        kind: BulkFailureKind::PayoutCreationFailed,
                        detail: "approved job has no assigned appraiser".to_string(),
                    });
                    continue;
                }
            };

            let request = PayoutRequest {
                job_id: job_id.clone(),
                appraiser_id,
                amount_cents: record.job.scope.price_cents,
            };
            if let Err(err) = self.payouts.create_payout(request) {
                tracing::warn!(job_id = %job_id, error = %err, "payout creation degraded");
                outcome.failures.push(BulkFailure {
                    job_id: job_id.clone(),
                    kind: BulkFailureKind::PayoutCreationFailed,
                    detail: err.to_string(),
                });
            }
        }

        outcome
    }
}

fn failure(job_id: &JobId, err: &JobWorkflowError) -> BulkFailure {
    let kind = match err {
        JobWorkflowError::NotFound(_) => BulkFailureKind::NotFound,
        JobWorkflowError::Validation(_) => BulkFailureKind::ValidationError,
        JobWorkflowError::Transition(_) => BulkFailureKind::IllegalTransition,
        JobWorkflowError::Conflict(_) => BulkFailureKind::ConcurrencyConflict,
        JobWorkflowError::Repository(_) => BulkFailureKind::StoreUnavailable,
    };

    BulkFailure {
        job_id: job_id.clone(),
        kind,
        detail: err.to_string(),
    }
}
