use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::domain::{Dispute, DisputeComment, DisputeId, DisputeStatus, NewDispute};
use super::repository::{
    BillingGateway, DisputeRecord, DisputeRepository, RefundGateway, RefundId, RefundRequest,
};
use super::state_machine::{DisputeStateMachine, IllegalTransition};
use crate::clock::Clock;
use crate::workflows::jobs::domain::{Actor, ActorRole, JobId};
use crate::workflows::jobs::service::MAX_TRANSITION_ATTEMPTS;
use crate::workflows::notify::{self, Notice, NotificationGateway};
use crate::workflows::store::RepositoryError;

static DISPUTE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_dispute_id() -> DisputeId {
    let id = DISPUTE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DisputeId(format!("dsp-{id:06}"))
}

/// Error raised by the dispute workflow service.
#[derive(Debug, thiserror::Error)]
pub enum DisputeWorkflowError {
    #[error("dispute {0} not found")]
    NotFound(DisputeId),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Transition(#[from] IllegalTransition),
    #[error("dispute {0} was modified concurrently; retry against the latest version")]
    Conflict(DisputeId),
    #[error(transparent)]
    Repository(RepositoryError),
}

/// Resolution input: mandatory text, optional refund.
#[derive(Debug, Clone)]
pub struct ResolveCommand {
    pub resolution: String,
    pub refund_amount_cents: Option<u32>,
    pub actor: Actor,
}

/// Comment input; legal in every dispute status.
#[derive(Debug, Clone)]
pub struct CommentCommand {
    pub author: Actor,
    pub content: String,
    pub is_internal: bool,
}

/// What happened to the refund after the resolution committed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RefundDisposition {
    Issued { refund_id: RefundId },
    /// The resolution stands; the refund needs a retry.
    Degraded { error: String },
}

/// Result of `resolve`: the committed record plus the side-effect outcomes.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionOutcome {
    pub record: DisputeRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundDisposition>,
    /// Set when the refund cap could not be checked against billing; the
    /// amount must be reconciled out of band.
    pub needs_reconciliation: bool,
}

/// Service validating and committing dispute transitions.
///
/// Refund issuance runs after the `resolved` commit and never reverts it;
/// a refused refund surfaces as a degraded disposition, mirroring the
/// payout policy on bulk job approval.
pub struct DisputeWorkflowService<R, F, B, N> {
    repository: Arc<R>,
    refunds: Arc<F>,
    billing: Arc<B>,
    notifications: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<R, F, B, N> DisputeWorkflowService<R, F, B, N>
where
    R: DisputeRepository + 'static,
    F: RefundGateway + 'static,
    B: BillingGateway + 'static,
    N: NotificationGateway + 'static,
{
    pub fn new(
        repository: Arc<R>,
        refunds: Arc<F>,
        billing: Arc<B>,
        notifications: Arc<N>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            refunds,
            billing,
            notifications,
            clock,
        }
    }

    /// File a new dispute; it starts `open`.
    pub fn open(&self, filing: NewDispute) -> Result<DisputeRecord, DisputeWorkflowError> {
        if filing.priority == 0 {
            return Err(DisputeWorkflowError::Validation(
                "priority starts at 1 (critical)".to_string(),
            ));
        }

        let dispute = Dispute::open(
            next_dispute_id(),
            filing.organization_id,
            filing.related_job_id.map(JobId),
            filing.priority,
            self.clock.now(),
        );

        self.repository
            .insert(dispute)
            .map_err(DisputeWorkflowError::Repository)
    }

    pub fn get(&self, id: &DisputeId) -> Result<DisputeRecord, DisputeWorkflowError> {
        self.repository
            .fetch(id)
            .map_err(DisputeWorkflowError::Repository)?
            .ok_or_else(|| DisputeWorkflowError::NotFound(id.clone()))
    }

    /// Explicitly move an open dispute under review.
    pub fn begin_review(
        &self,
        id: &DisputeId,
        actor: &Actor,
    ) -> Result<DisputeRecord, DisputeWorkflowError> {
        let stored = self.commit(id, |mut dispute| {
            DisputeStateMachine::validate(dispute.status, DisputeStatus::UnderReview)?;
            dispute.status = DisputeStatus::UnderReview;
            Ok(dispute)
        })?;

        self.notify_status(&stored.dispute, actor, None);
        Ok(stored)
    }

    /// Resolve with mandatory text and an optional refund. The refund amount
    /// is capped by what billing says was paid for the related job; when that
    /// check cannot run, the resolution still commits and the outcome carries
    /// a reconciliation flag.
    pub fn resolve(
        &self,
        id: &DisputeId,
        command: &ResolveCommand,
    ) -> Result<ResolutionOutcome, DisputeWorkflowError> {
        let resolution = command.resolution.trim();
        if resolution.is_empty() {
            return Err(DisputeWorkflowError::Validation(
                "resolving a dispute requires a non-empty resolution".to_string(),
            ));
        }
        if command.refund_amount_cents == Some(0) {
            return Err(DisputeWorkflowError::Validation(
                "refund amount must be greater than zero".to_string(),
            ));
        }

        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let record = self.get(id)?;
            let mut dispute = record.dispute;
            DisputeStateMachine::validate(dispute.status, DisputeStatus::Resolved)?;

            let mut needs_reconciliation = false;
            if let Some(amount) = command.refund_amount_cents {
                match dispute.related_job_id.as_ref() {
                    Some(job_id) => match self.billing.amount_paid(job_id) {
                        Ok(paid) if amount > paid => {
                            return Err(DisputeWorkflowError::Validation(format!(
                                "refund of {amount} cents exceeds the {paid} cents paid for job {job_id}"
                            )));
                        }
                        Ok(_) => {}
                        Err(err) => {
                            tracing::warn!(
                                dispute_id = %id,
                                error = %err,
                                "refund cap check unavailable; flagging for reconciliation"
                            );
                            needs_reconciliation = true;
                        }
                    },
                    None => needs_reconciliation = true,
                }
            }

            // resolution, refund amount, and resolved_at land in one commit.
            let now = self.clock.now();
            dispute.status = DisputeStatus::Resolved;
            dispute.resolution = Some(resolution.to_string());
            dispute.refund_amount_cents = command.refund_amount_cents;
            dispute.resolved_at = Some(now);

            match self.repository.update(DisputeRecord {
                dispute,
                version: record.version,
            }) {
                Ok(stored) => {
                    self.notify_status(&stored.dispute, &command.actor, Some(resolution));

                    let refund = command.refund_amount_cents.map(|amount_cents| {
                        let request = RefundRequest {
                            dispute_id: id.clone(),
                            amount_cents,
                        };
                        match self.refunds.issue_refund(request) {
                            Ok(refund_id) => RefundDisposition::Issued { refund_id },
                            Err(err) => {
                                tracing::warn!(
                                    dispute_id = %id,
                                    error = %err,
                                    "refund issuance degraded"
                                );
                                RefundDisposition::Degraded {
                                    error: err.to_string(),
                                }
                            }
                        }
                    });

                    return Ok(ResolutionOutcome {
                        record: stored,
                        refund,
                        needs_reconciliation,
                    });
                }
                Err(RepositoryError::VersionConflict) => continue,
                Err(RepositoryError::NotFound) => {
                    return Err(DisputeWorkflowError::NotFound(id.clone()))
                }
                Err(other) => return Err(DisputeWorkflowError::Repository(other)),
            }
        }

        Err(DisputeWorkflowError::Conflict(id.clone()))
    }

    /// Escalate with a mandatory reason, recorded as an internal comment.
    pub fn escalate(
        &self,
        id: &DisputeId,
        reason: &str,
        actor: &Actor,
    ) -> Result<DisputeRecord, DisputeWorkflowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DisputeWorkflowError::Validation(
                "escalating a dispute requires a non-empty reason".to_string(),
            ));
        }

        let stored = self.commit(id, |mut dispute| {
            DisputeStateMachine::validate(dispute.status, DisputeStatus::Escalated)?;
            dispute.status = DisputeStatus::Escalated;
            dispute.comments.push(DisputeComment {
                author: actor.clone(),
                content: reason.to_string(),
                is_internal: true,
                at: self.clock.now(),
            });
            Ok(dispute)
        })?;

        self.notify_status(&stored.dispute, actor, Some(reason));
        Ok(stored)
    }

    /// Close without a resolution.
    pub fn close(
        &self,
        id: &DisputeId,
        actor: &Actor,
    ) -> Result<DisputeRecord, DisputeWorkflowError> {
        let stored = self.commit(id, |mut dispute| {
            DisputeStateMachine::validate(dispute.status, DisputeStatus::Closed)?;
            dispute.status = DisputeStatus::Closed;
            Ok(dispute)
        })?;

        self.notify_status(&stored.dispute, actor, None);
        Ok(stored)
    }

    /// Append a comment. Legal in every status, terminal ones included, so
    /// the thread stays usable for audit. The first admin comment on an open
    /// dispute implicitly moves it under review; no other case touches
    /// status.
    pub fn add_comment(
        &self,
        id: &DisputeId,
        command: &CommentCommand,
    ) -> Result<DisputeRecord, DisputeWorkflowError> {
        let content = command.content.trim();
        if content.is_empty() {
            return Err(DisputeWorkflowError::Validation(
                "a comment requires non-empty content".to_string(),
            ));
        }

        self.commit(id, |mut dispute| {
            dispute.comments.push(DisputeComment {
                author: command.author.clone(),
                content: content.to_string(),
                is_internal: command.is_internal,
                at: self.clock.now(),
            });

            if command.author.role == ActorRole::Admin && dispute.status == DisputeStatus::Open {
                dispute.status = DisputeStatus::UnderReview;
            }

            Ok(dispute)
        })
    }

    /// Read-validate-write with bounded retries on version conflicts.
    fn commit<A>(&self, id: &DisputeId, apply: A) -> Result<DisputeRecord, DisputeWorkflowError>
    where
        A: Fn(Dispute) -> Result<Dispute, DisputeWorkflowError>,
    {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let record = self.get(id)?;
            let dispute = apply(record.dispute)?;

            match self.repository.update(DisputeRecord {
                dispute,
                version: record.version,
            }) {
                Ok(stored) => return Ok(stored),
                Err(RepositoryError::VersionConflict) => continue,
                Err(RepositoryError::NotFound) => {
                    return Err(DisputeWorkflowError::NotFound(id.clone()))
                }
                Err(other) => return Err(DisputeWorkflowError::Repository(other)),
            }
        }

        Err(DisputeWorkflowError::Conflict(id.clone()))
    }

    fn notify_status(&self, dispute: &Dispute, actor: &Actor, detail: Option<&str>) {
        let mut notice = Notice::new("dispute_status_changed", dispute.organization_id.clone())
            .with_detail("dispute_id", dispute.id.0.clone())
            .with_detail("status", dispute.status.label())
            .with_detail("actor_role", actor.role.label());
        if let Some(detail) = detail {
            notice = notice.with_detail("detail", detail);
        }
        notify::dispatch_best_effort(self.notifications.as_ref(), notice);
    }
}
