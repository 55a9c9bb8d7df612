use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::domain::{
    Actor, ActorRole, Job, JobId, JobStatus, NewJob, ScopePreset, StatusHistoryEntry,
};
use super::repository::{JobRecord, JobRepository};
use super::sla::{self, BreachReport};
use super::state_machine::{IllegalTransition, JobStateMachine};
use crate::clock::Clock;
use crate::workflows::notify::{self, Notice, NotificationGateway};
use crate::workflows::store::RepositoryError;

/// Conditional-write attempts before a transition gives up with `Conflict`.
pub const MAX_TRANSITION_ATTEMPTS: usize = 3;

static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_job_id() -> JobId {
    let id = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    JobId(format!("job-{id:06}"))
}

/// A requested status change with the context its preconditions need.
#[derive(Debug, Clone)]
pub struct TransitionCommand {
    pub to: JobStatus,
    pub actor: Actor,
    pub reason: Option<String>,
    pub appraiser_id: Option<String>,
}

impl TransitionCommand {
    pub fn new(to: JobStatus, actor: Actor) -> Self {
        Self {
            to,
            actor,
            reason: None,
            appraiser_id: None,
        }
    }

    pub fn dispatch(actor: Actor, appraiser_id: impl Into<String>) -> Self {
        Self {
            appraiser_id: Some(appraiser_id.into()),
            ..Self::new(JobStatus::Dispatched, actor)
        }
    }

    pub fn cancel(actor: Actor, reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::new(JobStatus::Cancelled, actor)
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Error raised by the job lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum JobWorkflowError {
    #[error("job {0} not found")]
    NotFound(JobId),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Transition(#[from] IllegalTransition),
    #[error("job {0} was modified concurrently; retry against the latest version")]
    Conflict(JobId),
    #[error(transparent)]
    Repository(RepositoryError),
}

/// Service validating and committing job transitions.
///
/// Each transition re-reads the latest record, validates against it, and
/// commits with a conditional write; on a version conflict the whole
/// read-validate-write cycle reruns so stale state is never overwritten.
/// Notification is dispatched only after the commit and never fails it.
pub struct JobLifecycleService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<R, N> JobLifecycleService<R, N>
where
    R: JobRepository + 'static,
    N: NotificationGateway + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            notifications,
            clock,
        }
    }

    /// Place a new order; the job starts in `pending_dispatch`.
    pub fn create(&self, order: NewJob) -> Result<JobRecord, JobWorkflowError> {
        let scope = ScopePreset::by_key(&order.scope).ok_or_else(|| {
            JobWorkflowError::Validation(format!("unknown scope preset '{}'", order.scope))
        })?;

        let job = Job::pending(
            next_job_id(),
            order.organization_id,
            order.property_id,
            scope,
        );

        self.repository
            .insert(job)
            .map_err(JobWorkflowError::Repository)
    }

    pub fn get(&self, id: &JobId) -> Result<JobRecord, JobWorkflowError> {
        self.repository
            .fetch(id)
            .map_err(JobWorkflowError::Repository)?
            .ok_or_else(|| JobWorkflowError::NotFound(id.clone()))
    }

    /// Validate and commit one transition, appending to the status history.
    pub fn transition(
        &self,
        id: &JobId,
        command: &TransitionCommand,
    ) -> Result<JobRecord, JobWorkflowError> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let record = self.get(id)?;
            let job = Self::apply(record.job, command, self.clock.now())?;

            match self.repository.update(JobRecord {
                job,
                version: record.version,
            }) {
                Ok(stored) => {
                    notify::dispatch_best_effort(
                        self.notifications.as_ref(),
                        Self::transition_notice(&stored.job, command),
                    );
                    return Ok(stored);
                }
                Err(RepositoryError::VersionConflict) => continue,
                Err(RepositoryError::NotFound) => {
                    return Err(JobWorkflowError::NotFound(id.clone()))
                }
                Err(other) => return Err(JobWorkflowError::Repository(other)),
            }
        }

        Err(JobWorkflowError::Conflict(id.clone()))
    }

    /// Evaluate every active job against the clock.
    pub fn breach_report(&self) -> Result<BreachReport, JobWorkflowError> {
        let records = self
            .repository
            .active()
            .map_err(JobWorkflowError::Repository)?;
        let now = self.clock.now();
        Ok(sla::breach_report(
            records.iter().map(|record| &record.job),
            now,
        ))
    }

    /// Pure transition application: legal-table check, preconditions, then
    /// the derived effects on `sla_due_at`, assignment, and history.
    fn apply(
        mut job: Job,
        command: &TransitionCommand,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Job, JobWorkflowError> {
        JobStateMachine::validate(job.status, command.to)?;

        let reason = command
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|reason| !reason.is_empty());

        match command.to {
            JobStatus::Cancelled => {
                if reason.is_none() {
                    return Err(JobWorkflowError::Validation(
                        "cancelling a job requires a non-empty reason".to_string(),
                    ));
                }
            }
            JobStatus::Dispatched => {
                let candidate = command
                    .appraiser_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .or_else(|| job.assigned_appraiser_id.clone());
                match candidate {
                    Some(appraiser) => job.assigned_appraiser_id = Some(appraiser),
                    None => {
                        return Err(JobWorkflowError::Validation(
                            "dispatch requires an appraiser candidate".to_string(),
                        ))
                    }
                }
            }
            JobStatus::Accepted => {
                let assigned = job.assigned_appraiser_id.as_deref().ok_or_else(|| {
                    JobWorkflowError::Validation(
                        "job has no assigned appraiser to accept it".to_string(),
                    )
                })?;
                if command.actor.role != ActorRole::Appraiser || command.actor.id != assigned {
                    return Err(JobWorkflowError::Validation(format!(
                        "only the assigned appraiser ({assigned}) may accept this job"
                    )));
                }
            }
            _ => {}
        }

        let from = job.status;
        job.status = command.to;

        if command.to == JobStatus::Dispatched {
            job.sla_due_at = Some(sla::due_at(&job.scope, now));
        } else if command.to.is_terminal() {
            job.sla_due_at = None;
        }

        job.status_history.push(StatusHistoryEntry {
            from,
            to: command.to,
            actor: command.actor.clone(),
            at: now,
            reason: reason.map(str::to_string),
        });

        Ok(job)
    }

    /// Appraiser-driven changes inform the organization; everything else
    /// informs the assigned appraiser, or the organization while unassigned.
    fn transition_notice(job: &Job, command: &TransitionCommand) -> Notice {
        let recipient = match command.actor.role {
            ActorRole::Appraiser => job.organization_id.clone(),
            _ => job
                .assigned_appraiser_id
                .clone()
                .unwrap_or_else(|| job.organization_id.clone()),
        };

        let mut notice = Notice::new("job_status_changed", recipient)
            .with_detail("job_id", job.id.0.clone())
            .with_detail("status", job.status.label());
        if let Some(reason) = command.reason.as_deref() {
            notice = notice.with_detail("reason", reason);
        }
        notice
    }
}
