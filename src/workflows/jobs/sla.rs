//! Pure SLA computations over jobs and a clock reading.
//!
//! Breach is never persisted; it is re-derived from `sla_due_at` and the
//! current instant every time it is needed, so a stored flag can never drift
//! from the clock.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Job, JobId, JobStatus, ScopePreset};

/// Deadline for a job dispatched at `dispatched_at` under the given preset.
pub fn due_at(scope: &ScopePreset, dispatched_at: DateTime<Utc>) -> DateTime<Utc> {
    dispatched_at + scope.sla()
}

/// True iff the job carries a due date, the due date has passed, and the job
/// is still in an SLA-governed status. Submitted work is out of the window:
/// the deliverable is with the reviewer, not the appraiser.
pub fn is_breached(job: &Job, now: DateTime<Utc>) -> bool {
    let due = match job.sla_due_at {
        Some(due) => due,
        None => return false,
    };

    matches!(
        job.status,
        JobStatus::Dispatched | JobStatus::Accepted | JobStatus::InProgress
    ) && now > due
}

pub fn breach_count<'a>(jobs: impl IntoIterator<Item = &'a Job>, now: DateTime<Utc>) -> usize {
    jobs.into_iter().filter(|job| is_breached(job, now)).count()
}

/// One breached job in the aggregate report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreachedJob {
    pub job_id: JobId,
    pub status: JobStatus,
    pub due_at: DateTime<Utc>,
    pub overdue_minutes: i64,
}

/// Aggregate surfaced to the admin query layer and the periodic sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BreachReport {
    pub evaluated: usize,
    pub breached: usize,
    pub breached_jobs: Vec<BreachedJob>,
}

/// Evaluate a collection of jobs, listing breaches oldest deadline first.
pub fn breach_report<'a>(
    jobs: impl IntoIterator<Item = &'a Job>,
    now: DateTime<Utc>,
) -> BreachReport {
    let mut report = BreachReport::default();

    for job in jobs {
        report.evaluated += 1;
        if is_breached(job, now) {
            let due = job.sla_due_at.expect("breached job carries a due date");
            report.breached_jobs.push(BreachedJob {
                job_id: job.id.clone(),
                status: job.status,
                due_at: due,
                overdue_minutes: (now - due).num_minutes(),
            });
        }
    }

    report
        .breached_jobs
        .sort_by(|a, b| a.due_at.cmp(&b.due_at));
    report.breached = report.breached_jobs.len();

    report
}
